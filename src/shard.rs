//! Shard descriptors: contiguous, non-overlapping slices of a corpus.
//!
//! A corpus of `n` records split into `count` shards gives every shard
//! `n / count` records, and the last shard also takes the remainder. The
//! union of all shard ranges is exactly `0..n`. Separate processes each own
//! one shard, so no coordination is needed between them.

use serde::Serialize;
use std::fmt;
use std::ops::Range;

use crate::error::{CorpusError, CorpusResult};

/// `(shard_id, shard_count)` with `shard_id < shard_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ShardSpec {
    id: usize,
    count: usize,
}

impl Default for ShardSpec {
    fn default() -> Self {
        Self::whole()
    }
}

impl ShardSpec {
    /// # Errors
    /// [`CorpusError::InvalidConfig`] unless `0 <= id < count`.
    pub fn new(id: usize, count: usize) -> CorpusResult<Self> {
        if count == 0 {
            return Err(CorpusError::InvalidConfig("shard count must be at least 1".into()));
        }
        if id >= count {
            return Err(CorpusError::InvalidConfig(format!(
                "shard id {id} out of range for {count} shards"
            )));
        }
        Ok(Self { id, count })
    }

    /// The single shard covering the whole corpus.
    #[must_use]
    pub const fn whole() -> Self {
        Self { id: 0, count: 1 }
    }

    pub const fn id(&self) -> usize {
        self.id
    }

    pub const fn count(&self) -> usize {
        self.count
    }

    pub const fn is_last(&self) -> bool {
        self.id + 1 == self.count
    }

    /// Record index range owned by this shard in a corpus of `total` records.
    #[must_use]
    pub fn range(&self, total: usize) -> Range<usize> {
        let size = total / self.count;
        let start = self.id * size;
        let end = if self.is_last() { total } else { start + size };
        start..end
    }

    /// All shards of a `count`-way split, in shard order.
    ///
    /// # Errors
    /// [`CorpusError::InvalidConfig`] if `count` is zero.
    pub fn all(count: usize) -> CorpusResult<Vec<Self>> {
        (0..count.max(1))
            .map(|id| Self::new(id, count))
            .collect()
    }
}

impl fmt::Display for ShardSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.count)
    }
}
