//! Line-delimited embedding sink.
//!
//! Writes `<dir>/embeddings.jsonl`, one object per record:
//!
//! ```text
//! {"id":"d1","contents":"title\ntext","vector":[0.1,0.2]}
//! ```
//!
//! `contents` is the requested field values joined by `\n`. Dense vectors are
//! plain arrays; sparse vectors are `{term: weight}` objects. The file is
//! flushed after every batch so an aborted run leaves a valid prefix.

use serde::{Deserialize, Serialize};
use std::fs::{File, create_dir_all};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{RepresentationWriter, WriterState, check_batch_shape};
use crate::encoder::Representation;
use crate::error::{CorpusError, CorpusResult, LineLocation};
use crate::reader::Batch;

/// File name of the embedding records inside the target directory.
pub const EMBEDDINGS_FILE: &str = "embeddings.jsonl";

const KIND: &str = "jsonl";

/// One persisted `{id, contents, vector}` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub contents: String,
    pub vector: Representation,
}

#[derive(Serialize)]
struct EmbeddingLine<'a> {
    id: &'a str,
    contents: String,
    vector: &'a Representation,
}

/// Writes embedding records as JSON lines.
#[derive(Debug)]
pub struct JsonlWriter {
    dir: PathBuf,
    state: WriterState,
    out: Option<BufWriter<File>>,
    written: usize,
}

impl JsonlWriter {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            state: WriterState::Unopened,
            out: None,
            written: 0,
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(EMBEDDINGS_FILE)
    }

    /// Records written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

impl RepresentationWriter for JsonlWriter {
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
        create_dir_all(&self.dir).map_err(|e| CorpusError::io(&self.dir, e))?;
        let path = self.path();
        let file = File::create(&path).map_err(|e| CorpusError::io(&path, e))?;
        self.state.advance(KIND, "open")?;
        self.out = Some(BufWriter::new(file));
        tracing::debug!(path = %path.display(), "opened embedding sink");
        Ok(())
    }

    fn write(&mut self, batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()> {
        self.state.advance(KIND, "write")?;
        check_batch_shape(batch, vectors)?;
        let path = self.path();
        let Some(out) = self.out.as_mut() else {
            return Err(CorpusError::InvalidWriterState {
                writer: KIND,
                operation: "write",
                state: self.state,
            });
        };
        for (row, (id, vector)) in batch.ids().iter().zip(vectors).enumerate() {
            let line = EmbeddingLine {
                id,
                contents: batch.contents(row),
                vector,
            };
            serde_json::to_writer(&mut *out, &line).map_err(|e| CorpusError::io(&path, e.into()))?;
            out.write_all(b"\n").map_err(|e| CorpusError::io(&path, e))?;
        }
        out.flush().map_err(|e| CorpusError::io(&path, e))?;
        self.written += batch.len();
        Ok(())
    }

    fn close(&mut self) -> CorpusResult<()> {
        self.state.advance(KIND, "close")?;
        let path = self.path();
        if let Some(mut out) = self.out.take() {
            out.flush().map_err(|e| CorpusError::io(&path, e))?;
            out.get_ref().sync_all().map_err(|e| CorpusError::io(&path, e))?;
        }
        tracing::info!(path = %path.display(), records = self.written, "embedding sink closed");
        Ok(())
    }
}

/// Read back every embedding record of a sink directory.
///
/// # Errors
/// [`CorpusError::Io`] if the file cannot be read and
/// [`CorpusError::MalformedRecord`] for a line that does not parse.
pub fn read_embeddings(dir: impl AsRef<Path>) -> CorpusResult<Vec<EmbeddingRecord>> {
    let path = dir.as_ref().join(EMBEDDINGS_FILE);
    let file = File::open(&path).map_err(|e| CorpusError::io(&path, e))?;
    let mut out = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| CorpusError::io(&path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| CorpusError::MalformedRecord {
            location: LineLocation::new(&path, i + 1),
            reason: e.to_string(),
        })?;
        out.push(record);
    }
    Ok(out)
}
