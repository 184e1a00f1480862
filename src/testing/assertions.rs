//! Assertions over readers and batches.

use crate::reader::CorpusReader;
use crate::shard::ShardSpec;

/// Ids of every batch of one shard, batch by batch.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
#[must_use]
pub fn batch_ids(reader: &CorpusReader, batch_size: usize, shard: ShardSpec) -> Vec<Vec<String>> {
    reader
        .iterate(batch_size, shard)
        .unwrap_or_else(|e| panic!("cannot iterate shard {shard}: {e}"))
        .map(|batch| batch.ids().to_vec())
        .collect()
}

/// Assert that a `shard_count`-way split visits every record exactly once, in
/// corpus order, with full batches except at the end of each shard.
///
/// # Panics
///
/// Panics with the offending shard if the partition is not exact.
///
/// # Example
///
/// ```no_run
/// use ironcorpus::testing::*;
/// use ironcorpus::{CorpusReader, FieldSchema};
///
/// # fn main() -> anyhow::Result<()> {
/// let corpus = TempCorpus::with_lines(&numbered_corpus(10))?;
/// let reader = CorpusReader::open(corpus.path(), FieldSchema::default())?;
/// assert_shards_partition(&reader, 3, 4);
/// # Ok(())
/// # }
/// ```
pub fn assert_shards_partition(reader: &CorpusReader, batch_size: usize, shard_count: usize) {
    let mut visited = Vec::with_capacity(reader.len());
    let shards = ShardSpec::all(shard_count)
        .unwrap_or_else(|e| panic!("invalid shard count {shard_count}: {e}"));
    for shard in shards {
        let batches = batch_ids(reader, batch_size, shard);
        let last = batches.len().saturating_sub(1);
        for (i, ids) in batches.iter().enumerate() {
            assert!(
                !ids.is_empty() && ids.len() <= batch_size,
                "shard {shard}: batch {i} has {} records (batch size {batch_size})",
                ids.len()
            );
            assert!(
                i == last || ids.len() == batch_size,
                "shard {shard}: only the last batch may be short, batch {i} has {}",
                ids.len()
            );
        }
        visited.extend(batches.into_iter().flatten());
    }
    assert_eq!(
        visited,
        reader.ids(),
        "shards of a {shard_count}-way split do not cover the corpus exactly once"
    );
}
