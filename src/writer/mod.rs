//! Representation writers: sinks that persist encoded batches.
//!
//! Every writer follows the same state machine:
//!
//! ```text
//! Unopened --open--> Open --close--> Closed
//!                    |  ^
//!                    write
//! ```
//!
//! `write` is only valid while `Open`; `open` only from `Unopened`; `close`
//! only once. Anything else is an [`InvalidWriterState`](CorpusError::InvalidWriterState)
//! error.
//!
//! [`ScopedWriter`] holds a writer for the duration of a run and closes it
//! when dropped, so output is flushed even when encoding or writing fails
//! halfway through a batch.

pub mod flat;
pub mod jsonl;

pub use flat::{DOCID_FILE, FlatIndex, FlatIndexWriter, Hit, INDEX_FILE, Metric, read_docids};
pub use jsonl::{EMBEDDINGS_FILE, EmbeddingRecord, JsonlWriter, read_embeddings};

use crate::encoder::Representation;
use crate::error::{CorpusError, CorpusResult};
use crate::reader::Batch;

/// Lifecycle state of a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriterState {
    Unopened,
    Open,
    Closed,
}

impl WriterState {
    /// Move to `next`, checking the transition is legal for `operation`.
    ///
    /// # Errors
    /// [`CorpusError::InvalidWriterState`] on an illegal transition.
    pub fn advance(
        &mut self,
        writer: &'static str,
        operation: &'static str,
    ) -> CorpusResult<()> {
        let next = match (operation, *self) {
            ("open", WriterState::Unopened) => WriterState::Open,
            ("write", WriterState::Open) => WriterState::Open,
            ("close", WriterState::Open) => WriterState::Closed,
            (_, state) => {
                return Err(CorpusError::InvalidWriterState {
                    writer,
                    operation,
                    state,
                });
            }
        };
        *self = next;
        Ok(())
    }
}

/// A sink for encoded batches.
pub trait RepresentationWriter {
    /// Short name used in errors and logs.
    fn kind(&self) -> &'static str;

    fn state(&self) -> WriterState;

    /// Acquire the target: create the directory and open file handles.
    ///
    /// # Errors
    /// Illegal state, or I/O failure creating the target.
    fn open(&mut self) -> CorpusResult<()>;

    /// Append one batch; `vectors[i]` belongs to row `i` of `batch`.
    ///
    /// # Errors
    /// Illegal state, a vector count different from the batch size, a vector
    /// the sink cannot store, or I/O failure.
    fn write(&mut self, batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()>;

    /// Flush and release the target.
    ///
    /// # Errors
    /// Illegal state, or I/O failure while flushing.
    fn close(&mut self) -> CorpusResult<()>;
}

impl<W: RepresentationWriter + ?Sized> RepresentationWriter for Box<W> {
    fn kind(&self) -> &'static str {
        (**self).kind()
    }

    fn state(&self) -> WriterState {
        (**self).state()
    }

    fn open(&mut self) -> CorpusResult<()> {
        (**self).open()
    }

    fn write(&mut self, batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()> {
        (**self).write(batch, vectors)
    }

    fn close(&mut self) -> CorpusResult<()> {
        (**self).close()
    }
}

/// Reject a batch whose vector count does not match its row count.
pub(crate) fn check_batch_shape(batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()> {
    if batch.len() != vectors.len() {
        return Err(CorpusError::EncoderOutputMismatch {
            expected: batch.len(),
            actual: vectors.len(),
        });
    }
    Ok(())
}

/// An open writer that is closed on every exit path.
///
/// Call [`finish`](ScopedWriter::finish) to close explicitly and observe the
/// result. If the guard is dropped instead (early return, `?`, panic unwind),
/// the writer is closed in `Drop` and a close failure is logged.
pub struct ScopedWriter<W: RepresentationWriter> {
    inner: Option<W>,
}

impl<W: RepresentationWriter> ScopedWriter<W> {
    /// Open `writer` and take ownership of it for the scope.
    ///
    /// # Errors
    /// Whatever [`RepresentationWriter::open`] returns.
    pub fn open(mut writer: W) -> CorpusResult<Self> {
        writer.open()?;
        Ok(Self {
            inner: Some(writer),
        })
    }

    /// # Errors
    /// Whatever [`RepresentationWriter::write`] returns.
    pub fn write(&mut self, batch: &Batch<'_>, vectors: &[Representation]) -> CorpusResult<()> {
        match self.inner.as_mut() {
            Some(writer) => writer.write(batch, vectors),
            None => Err(CorpusError::InvalidWriterState {
                writer: "scoped",
                operation: "write",
                state: WriterState::Closed,
            }),
        }
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref()
    }

    /// Close the writer and hand it back.
    ///
    /// # Errors
    /// Whatever [`RepresentationWriter::close`] returns.
    pub fn finish(mut self) -> CorpusResult<W> {
        match self.inner.take() {
            Some(mut writer) => {
                writer.close()?;
                Ok(writer)
            }
            None => Err(CorpusError::InvalidWriterState {
                writer: "scoped",
                operation: "close",
                state: WriterState::Closed,
            }),
        }
    }
}

impl<W: RepresentationWriter> Drop for ScopedWriter<W> {
    fn drop(&mut self) {
        if let Some(writer) = self.inner.as_mut()
            && writer.state() == WriterState::Open
            && let Err(err) = writer.close()
        {
            tracing::warn!(writer = writer.kind(), error = %err, "closing writer on unwind failed");
        }
    }
}
