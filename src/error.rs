//! Error taxonomy for corpus ingestion and representation persistence.
//!
//! Every variant is fatal: nothing in the core retries. Corpus problems are
//! data-integrity violations that the caller fixes by repairing the corpus or
//! changing the field schema, and writer-state problems are contract
//! violations in the calling code.
//!
//! | Variant | Raised by | Meaning |
//! |---|---|---|
//! | [`CorpusNotFound`](CorpusError::CorpusNotFound) | reader open | path is neither file, directory, nor a matching glob |
//! | [`MalformedRecord`](CorpusError::MalformedRecord) | reader load | invalid JSON, or no explicit fields and no `contents` |
//! | [`FieldCountMismatch`](CorpusError::FieldCountMismatch) | record parser | packed `contents` split into the wrong number of pieces |
//! | [`DuplicateOrMissingId`](CorpusError::DuplicateOrMissingId) | reader load | no `id`/`docid` (or configured id key), or an id seen twice |
//! | [`InvalidWriterState`](CorpusError::InvalidWriterState) | writers | `write` outside `Open`, or a second `close` |
//! | [`DimensionMismatch`](CorpusError::DimensionMismatch) | flat sink | vector width differs from the index dimension |
//! | [`UnstorableId`](CorpusError::UnstorableId) | flat sink | id contains `\n` or `\r` and would break the `docid` file |

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::writer::WriterState;

/// Result alias used by the parser, reader and writers.
pub type CorpusResult<T> = Result<T, CorpusError>;

/// Position of a corpus line, used to give errors enough context to fix the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLocation {
    pub file: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

impl LineLocation {
    pub fn new(file: impl AsRef<Path>, line: usize) -> Self {
        Self {
            file: file.as_ref().to_path_buf(),
            line,
        }
    }
}

impl fmt::Display for LineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus not found: {path} is neither a file, a directory, nor a matching pattern")]
    CorpusNotFound { path: PathBuf },

    #[error("malformed record at {location}: {reason}")]
    MalformedRecord {
        location: LineLocation,
        reason: String,
    },

    #[error("{actual} fields found at {location}, {expected} fields expected")]
    FieldCountMismatch {
        location: LineLocation,
        expected: usize,
        actual: usize,
    },

    /// `id` is `None` when the record carried no id at all; `keys` are the
    /// keys the id was looked up under.
    #[error("{}", describe_id_error(.id.as_deref(), .keys, .location))]
    DuplicateOrMissingId {
        id: Option<String>,
        keys: Vec<String>,
        location: LineLocation,
    },

    #[error("cannot {operation} a {writer} writer in state {state:?}")]
    InvalidWriterState {
        writer: &'static str,
        operation: &'static str,
        state: WriterState,
    },

    #[error("vector for {id} has dimension {actual}, index expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },

    /// The id would not fit on one line of a line-oriented id file.
    #[error("{writer} writer cannot store id {id:?}: ids must not contain line breaks")]
    UnstorableId { writer: &'static str, id: String },

    #[error("{writer} writer cannot store a {kind} representation (record {id})")]
    UnsupportedRepresentation {
        writer: &'static str,
        kind: &'static str,
        id: String,
    },

    #[error("encoder returned {actual} representations for a batch of {expected} records")]
    EncoderOutputMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_id_error(id: Option<&str>, keys: &[String], location: &LineLocation) -> String {
    match id {
        Some(id) => format!("duplicate id {id:?} at {location}"),
        None => {
            let keys: Vec<String> = keys.iter().map(|k| format!("'{k}'")).collect();
            format!("cannot find {} at {location}", keys.join(" or "))
        }
    }
}

impl CorpusError {
    /// Wrap an I/O error together with the path it concerns.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}
