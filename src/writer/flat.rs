//! Flat (brute-force) vector index sink.
//!
//! The target directory holds two artifacts:
//!
//! - `docid`: one document id per line, in write order;
//! - `index`: the [`FlatIndex`] holding one row per id.
//!
//! Row `i` of the index belongs to line `i` of the id file. That pairing is
//! the only addressing scheme; the index stores no ids of its own. A batch is
//! validated in full before any of it is appended, so a rejected batch never
//! desynchronizes the two artifacts. Ids containing `\n` or `\r` are rejected
//! for the same reason.
//!
//! # Index file layout
//!
//! ```text
//! [magic "ICFLAT01"][postcard(FlatIndexBody)][sha256(body) 32 bytes]
//! ```
//!
//! The index is written to a temporary file, synced, and renamed into place
//! on close.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::{self, File, create_dir_all};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{RepresentationWriter, WriterState, check_batch_shape};
use crate::encoder::Representation;
use crate::error::{CorpusError, CorpusResult};
use crate::reader::Batch;

/// Id file name inside the target directory.
pub const DOCID_FILE: &str = "docid";

/// Index file name inside the target directory.
pub const INDEX_FILE: &str = "index";

const KIND: &str = "flat";
const MAGIC: &[u8; 8] = b"ICFLAT01";
const CHECKSUM_LEN: usize = 32;

/// Similarity used by [`FlatIndex::search`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Larger dot product is better.
    #[default]
    InnerProduct,
    /// Smaller squared Euclidean distance is better.
    L2,
}

/// One search result: the row number (= id file line) and its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub row: usize,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct FlatIndexBody {
    dimension: u64,
    metric: Metric,
    rows: u64,
    data: Vec<f32>,
}

/// Row-major matrix of fixed-width vectors with exact search.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    metric: Metric,
    data: Vec<f32>,
}

impl FlatIndex {
    /// # Errors
    /// [`CorpusError::InvalidConfig`] if `dimension` is zero.
    pub fn new(dimension: usize, metric: Metric) -> CorpusResult<Self> {
        if dimension == 0 {
            return Err(CorpusError::InvalidConfig(
                "flat index dimension must be at least 1".into(),
            ));
        }
        Ok(Self {
            dimension,
            metric,
            data: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn row(&self, row: usize) -> Option<&[f32]> {
        let start = row.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Check that `vector` fits this index; `id` only labels the error.
    ///
    /// # Errors
    /// [`CorpusError::DimensionMismatch`] on a width mismatch.
    pub fn check(&self, id: &str, vector: &[f32]) -> CorpusResult<()> {
        if vector.len() != self.dimension {
            return Err(CorpusError::DimensionMismatch {
                id: id.to_string(),
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Append one row.
    ///
    /// # Errors
    /// [`CorpusError::DimensionMismatch`] on a width mismatch.
    pub fn add(&mut self, id: &str, vector: &[f32]) -> CorpusResult<()> {
        self.check(id, vector)?;
        self.data.extend_from_slice(vector);
        Ok(())
    }

    fn rank_key(&self, query: &[f32], row: &[f32]) -> f32 {
        match self.metric {
            Metric::InnerProduct => query.iter().zip(row).map(|(a, b)| a * b).sum(),
            Metric::L2 => -query
                .iter()
                .zip(row)
                .map(|(a, b)| (a - b) * (a - b))
                .sum::<f32>(),
        }
    }

    /// Exact top-`k` rows for `query`, best first; ties go to the lower row.
    ///
    /// Scores are dot products for [`Metric::InnerProduct`] and squared
    /// distances for [`Metric::L2`].
    ///
    /// # Errors
    /// [`CorpusError::DimensionMismatch`] if the query width is wrong.
    pub fn search(&self, query: &[f32], k: usize) -> CorpusResult<Vec<Hit>> {
        self.check("query", query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        #[cfg(feature = "parallel-search")]
        let keys: Vec<f32> = {
            use rayon::prelude::*;
            self.data
                .par_chunks(self.dimension)
                .map(|row| self.rank_key(query, row))
                .collect()
        };
        #[cfg(not(feature = "parallel-search"))]
        let keys: Vec<f32> = self
            .data
            .chunks(self.dimension)
            .map(|row| self.rank_key(query, row))
            .collect();

        // min-heap of the k best (key, row) pairs; the root is the weakest
        let mut heap: BinaryHeap<Reverse<(OrderedFloat<f32>, Reverse<usize>)>> =
            BinaryHeap::with_capacity(k + 1);
        for (row, key) in keys.into_iter().enumerate() {
            let entry = (OrderedFloat(key), Reverse(row));
            if heap.len() < k {
                heap.push(Reverse(entry));
            } else if heap.peek().is_some_and(|weakest| entry > weakest.0) {
                heap.pop();
                heap.push(Reverse(entry));
            }
        }

        let mut best: Vec<_> = heap.into_iter().map(|Reverse(entry)| entry).collect();
        best.sort_unstable_by(|a, b| b.cmp(a));
        Ok(best
            .into_iter()
            .map(|(key, Reverse(row))| Hit {
                row,
                score: match self.metric {
                    Metric::InnerProduct => key.0,
                    Metric::L2 => -key.0,
                },
            })
            .collect())
    }

    /// Persist to `path` atomically.
    ///
    /// # Errors
    /// [`CorpusError::Io`] on any encoding or filesystem failure.
    pub fn save(&self, path: impl AsRef<Path>) -> CorpusResult<()> {
        let path = path.as_ref();
        let body = FlatIndexBody {
            dimension: self.dimension as u64,
            metric: self.metric,
            rows: self.len() as u64,
            data: self.data.clone(),
        };
        let payload = postcard::to_allocvec(&body)
            .map_err(|e| CorpusError::io(path, io::Error::other(e.to_string())))?;
        let checksum = Sha256::digest(&payload);

        let tmp = path.with_extension("tmp");
        let mut file = File::create(&tmp).map_err(|e| CorpusError::io(&tmp, e))?;
        file.write_all(MAGIC)
            .and_then(|()| file.write_all(&payload))
            .and_then(|()| file.write_all(checksum.as_slice()))
            .and_then(|()| file.sync_all())
            .map_err(|e| CorpusError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| CorpusError::io(path, e))?;
        Ok(())
    }

    /// Load an index written by [`FlatIndex::save`], verifying its checksum.
    ///
    /// # Errors
    /// [`CorpusError::Io`] if the file is unreadable, truncated, corrupted,
    /// or not an index file.
    pub fn load(path: impl AsRef<Path>) -> CorpusResult<Self> {
        let path = path.as_ref();
        let raw = fs::read(path).map_err(|e| CorpusError::io(path, e))?;
        let invalid = |msg: String| CorpusError::io(path, io::Error::new(io::ErrorKind::InvalidData, msg));

        if raw.len() < MAGIC.len() + CHECKSUM_LEN || &raw[..MAGIC.len()] != MAGIC {
            return Err(invalid("not a flat index file".into()));
        }
        let (payload, stored) = raw[MAGIC.len()..].split_at(raw.len() - MAGIC.len() - CHECKSUM_LEN);
        if Sha256::digest(payload).as_slice() != stored {
            return Err(invalid("flat index checksum mismatch".into()));
        }
        let body: FlatIndexBody =
            postcard::from_bytes(payload).map_err(|e| invalid(format!("decode flat index: {e}")))?;

        let dimension = usize::try_from(body.dimension)
            .map_err(|_| invalid("dimension out of range".into()))?;
        let rows = usize::try_from(body.rows).map_err(|_| invalid("row count out of range".into()))?;
        if dimension == 0 || rows.checked_mul(dimension) != Some(body.data.len()) {
            return Err(invalid(format!(
                "flat index holds {} values, expected {rows} rows of {dimension}",
                body.data.len()
            )));
        }
        Ok(Self {
            dimension,
            metric: body.metric,
            data: body.data,
        })
    }
}

/// Writes dense vectors into a [`FlatIndex`] plus a parallel id file.
#[derive(Debug)]
pub struct FlatIndexWriter {
    dir: PathBuf,
    dimension: usize,
    metric: Metric,
    state: WriterState,
    index: Option<FlatIndex>,
    docids: Option<BufWriter<File>>,
}

impl FlatIndexWriter {
    pub fn new(dir: impl AsRef<Path>, dimension: usize) -> Self {
        Self::with_metric(dir, dimension, Metric::default())
    }

    pub fn with_metric(dir: impl AsRef<Path>, dimension: usize, metric: Metric) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            dimension,
            metric,
            state: WriterState::Unopened,
            index: None,
            docids: None,
        }
    }

    pub fn docid_path(&self) -> PathBuf {
        self.dir.join(DOCID_FILE)
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// The in-memory index while the writer is open.
    pub fn index(&self) -> Option<&FlatIndex> {
        self.index.as_ref()
    }

    fn dense_rows<'v>(
        index: &FlatIndex,
        batch: &Batch<'_>,
        vectors: &'v [Representation],
    ) -> CorpusResult<Vec<&'v [f32]>> {
        batch
            .ids()
            .iter()
            .zip(vectors)
            .map(|(id, vector)| {
                if id.contains(['\n', '\r']) {
                    return Err(CorpusError::UnstorableId {
                        writer: KIND,
                        id: id.clone(),
                    });
                }
                let dense = vector.as_dense().ok_or_else(|| CorpusError::UnsupportedRepresentation {
                    writer: KIND,
                    kind: vector.kind(),
                    id: id.clone(),
                })?;
                index.check(id, dense)?;
                Ok(dense)
            })
            .collect()
    }
}

impl RepresentationWriter for FlatIndexWriter {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn state(&self) -> WriterState {
        self.state
    }

    fn open(&mut self) -> CorpusResult<()> {
        if self.state != WriterState::Unopened {
            return Err(CorpusError::InvalidWriterState {
                writer: KIND,
                operation: "open",
                state: self.state,
            });
        }
        let index = FlatIndex::new(self.dimension, self.metric)?;
        create_dir_all(&self.dir).map_err(|e| CorpusError::io(&self.dir, e))?;
        let path = self.docid_path();
        let file = File::create(&path).map_err(|e| CorpusError::io(&path, e))?;
        // stays Unopened unless every handle was acquired
        self.state.advance(KIND, "open")?;
        self.docids = Some(BufWriter::new(file));
        self.index = Some(index);
        tracing::debug!(dir = %self.dir.display(), dimension = self.dimension, "opened flat index sink");
        Ok(())
    }

    fn write(&mut self, batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()> {
        self.state.advance(KIND, "write")?;
        check_batch_shape(batch, vectors)?;
        let path = self.docid_path();
        let (Some(index), Some(docids)) = (self.index.as_mut(), self.docids.as_mut()) else {
            return Err(CorpusError::InvalidWriterState {
                writer: KIND,
                operation: "write",
                state: self.state,
            });
        };

        let rows = Self::dense_rows(index, batch, vectors)?;
        for (id, row) in batch.ids().iter().zip(rows) {
            writeln!(docids, "{id}").map_err(|e| CorpusError::io(&path, e))?;
            index.add(id, row)?;
        }
        docids.flush().map_err(|e| CorpusError::io(&path, e))?;
        Ok(())
    }

    fn close(&mut self) -> CorpusResult<()> {
        self.state.advance(KIND, "close")?;
        let docid_path = self.docid_path();
        if let Some(mut docids) = self.docids.take() {
            docids.flush().map_err(|e| CorpusError::io(&docid_path, e))?;
            docids
                .get_ref()
                .sync_all()
                .map_err(|e| CorpusError::io(&docid_path, e))?;
        }
        if let Some(index) = self.index.take() {
            index.save(self.index_path())?;
            tracing::info!(
                dir = %self.dir.display(),
                rows = index.len(),
                dimension = index.dimension(),
                "flat index sink closed"
            );
        }
        Ok(())
    }
}

/// Read the id file of a flat index directory, one id per row.
///
/// # Errors
/// [`CorpusError::Io`] if the file cannot be read.
pub fn read_docids(dir: impl AsRef<Path>) -> CorpusResult<Vec<String>> {
    let path = dir.as_ref().join(DOCID_FILE);
    let file = File::open(&path).map_err(|e| CorpusError::io(&path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .map_err(|e| CorpusError::io(&path, e))
}
