//! Sharded collection reader.
//!
//! [`CorpusReader::open`] eagerly loads a whole corpus into columnar storage:
//! one ordered column of ids and one column per requested field. The
//! in-memory layout keeps sharding and batching trivial slice arithmetic, at
//! the cost of holding the full corpus for the reader's lifetime. That is
//! fine for IR benchmark collections, but it is the scaling limit of this
//! reader; a streaming replacement would need an offset table to keep the
//! same partition and batch semantics.
//!
//! # Example
//! ```no_run
//! use ironcorpus::{CorpusReader, FieldSchema, ShardSpec};
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = FieldSchema::new(["title", "text"], "\n")?;
//! let reader = CorpusReader::open("collections/scifact/corpus.jsonl", schema)?;
//!
//! for batch in reader.iterate(32, ShardSpec::new(0, 4)?)? {
//!     let titles = batch.field("title").unwrap_or_default();
//!     println!("{} records, first title {:?}", batch.len(), titles.first());
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::io::BufRead;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::error::{CorpusError, CorpusResult, LineLocation};
use crate::io::{Codec, open_lines, resolve_corpus_files};
use crate::record::{FieldSchema, Record, parse_record};
use crate::shard::ShardSpec;

/// One file that contributed records to the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub codec: Codec,
    /// Corpus index range of the records loaded from this file.
    pub records: Range<usize>,
}

/// A fully loaded corpus, iterable in shard-bounded batches.
#[derive(Debug, Clone)]
pub struct CorpusReader {
    schema: FieldSchema,
    sources: Vec<SourceFile>,
    ids: Vec<String>,
    columns: Vec<Vec<String>>,
}

impl CorpusReader {
    /// Load the corpus at `path` (file, directory, or glob pattern).
    ///
    /// Lines that are empty or hold only whitespace carry no record and are
    /// skipped; they still count towards the line numbers reported in errors.
    /// Every other line must parse into a record.
    ///
    /// # Errors
    /// - [`CorpusError::CorpusNotFound`] if `path` denotes no file.
    /// - Any record-level error from the first offending line; the load
    ///   aborts rather than skipping records.
    pub fn open(path: impl AsRef<Path>, schema: FieldSchema) -> CorpusResult<Self> {
        let files = resolve_corpus_files(path.as_ref())?;
        Self::from_files(files, schema)
    }

    /// Load the given files, concatenated in the order given.
    ///
    /// # Errors
    /// See [`CorpusReader::open`].
    pub fn from_files<I, P>(files: I, schema: FieldSchema) -> CorpusResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut reader = Self {
            columns: vec![Vec::new(); schema.len()],
            schema,
            sources: Vec::new(),
            ids: Vec::new(),
        };
        let mut seen = HashSet::new();
        for file in files {
            reader.load_file(file.as_ref(), &mut seen)?;
        }
        tracing::info!(
            files = reader.sources.len(),
            records = reader.len(),
            fields = ?reader.schema.fields(),
            "corpus loaded"
        );
        Ok(reader)
    }

    fn load_file(&mut self, path: &Path, seen: &mut HashSet<String>) -> CorpusResult<()> {
        let (codec, lines) = open_lines(path)?;
        let start = self.ids.len();
        for (i, line) in lines.lines().enumerate() {
            let line = line.map_err(|e| CorpusError::io(path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let location = LineLocation::new(path, i + 1);
            let record = parse_record(&line, &self.schema, &location)?;
            if !seen.insert(record.id.clone()) {
                return Err(CorpusError::DuplicateOrMissingId {
                    id: Some(record.id),
                    keys: self.schema.id_keys(),
                    location,
                });
            }
            self.push(record);
        }
        let end = self.ids.len();
        tracing::debug!(
            path = %path.display(),
            codec = codec.name(),
            records = end - start,
            "loaded corpus file"
        );
        self.sources.push(SourceFile {
            path: path.to_path_buf(),
            codec,
            records: start..end,
        });
        Ok(())
    }

    fn push(&mut self, record: Record) {
        self.ids.push(record.id);
        for (column, value) in self.columns.iter_mut().zip(record.fields) {
            column.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn schema(&self) -> &FieldSchema {
        &self.schema
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Full column of one requested field.
    pub fn column(&self, field: &str) -> Option<&[String]> {
        self.schema.position(field).map(|i| self.columns[i].as_slice())
    }

    /// Materialize the record at corpus index `index`.
    pub fn record(&self, index: usize) -> Option<Record> {
        let id = self.ids.get(index)?.clone();
        let fields = self.columns.iter().map(|c| c[index].clone()).collect();
        Some(Record { id, fields })
    }

    /// Iterate one shard of the corpus in batches of at most `batch_size`.
    ///
    /// Batches come out in corpus order; all are full except possibly the
    /// last. The iterator is consumed as it goes; call `iterate` again for a
    /// fresh pass.
    ///
    /// # Errors
    /// [`CorpusError::InvalidConfig`] if `batch_size` is zero.
    pub fn iterate(&self, batch_size: usize, shard: ShardSpec) -> CorpusResult<BatchIter<'_>> {
        if batch_size == 0 {
            return Err(CorpusError::InvalidConfig("batch size must be at least 1".into()));
        }
        let window = shard.range(self.len());
        tracing::debug!(
            %shard,
            start = window.start,
            end = window.end,
            batch_size,
            "iterating shard"
        );
        Ok(BatchIter {
            reader: self,
            next: window.start,
            end: window.end,
            batch_size,
        })
    }

    fn batch(&self, range: Range<usize>) -> Batch<'_> {
        Batch {
            schema: &self.schema,
            ids: &self.ids[range.clone()],
            columns: self.columns.iter().map(|c| &c[range.clone()]).collect(),
            range,
        }
    }
}

/// Lazy sequence of [`Batch`]es over one shard.
#[derive(Debug)]
pub struct BatchIter<'a> {
    reader: &'a CorpusReader,
    next: usize,
    end: usize,
    batch_size: usize,
}

impl<'a> Iterator for BatchIter<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let stop = (self.next + self.batch_size).min(self.end);
        let batch = self.reader.batch(self.next..stop);
        self.next = stop;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end - self.next.min(self.end)).div_ceil(self.batch_size);
        (n, Some(n))
    }
}

impl ExactSizeIterator for BatchIter<'_> {}

/// A window of consecutive records, stored column-wise.
///
/// Every column has the same length as [`Batch::ids`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch<'a> {
    schema: &'a FieldSchema,
    range: Range<usize>,
    ids: &'a [String],
    columns: Vec<&'a [String]>,
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Corpus index range covered by this batch.
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn schema(&self) -> &'a FieldSchema {
        self.schema
    }

    pub fn ids(&self) -> &'a [String] {
        self.ids
    }

    /// Values of one requested field, in batch order.
    pub fn field(&self, name: &str) -> Option<&'a [String]> {
        self.schema.position(name).map(|i| self.columns[i])
    }

    /// `(field name, values)` pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'a str, &'a [String])> + '_ {
        self.schema
            .fields()
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().copied())
    }

    /// Requested field values of row `row` joined by a newline.
    pub fn contents(&self, row: usize) -> String {
        self.columns
            .iter()
            .map(|c| c[row].as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn record(&self, row: usize) -> Record {
        Record {
            id: self.ids[row].clone(),
            fields: self.columns.iter().map(|c| c[row].clone()).collect(),
        }
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.len()).map(|row| self.record(row)).collect()
    }
}
