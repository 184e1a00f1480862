//! # Ironcorpus
//!
//! A **corpus encoding pipeline** for reproducible retrieval experiments.
//! Ironcorpus reads a document collection stored as JSON lines, splits it into
//! shards and batches, hands each batch to an encoder, and persists the
//! resulting dense or sparse representations.
//!
//! ## Key Features
//!
//! - **Two record layouts** - explicit `title`/`text` keys or one packed
//!   `contents` string split by a delimiter
//! - **Exact sharding** - contiguous shards that cover the corpus exactly once,
//!   one process per shard
//! - **Deterministic batching** - same corpus, schema and shard always give the
//!   same batches in the same order
//! - **Pluggable encoders** - a small [`DocumentEncoder`] port plus a closed
//!   [`EncoderKind`] registry
//! - **Two sinks** - `embeddings.jsonl` records, or a flat vector index with a
//!   parallel id file
//! - **Compressed corpora** - gzip, zstd, bzip2 and xz (feature flags)
//!
//! ## Quick Start
//!
//! ```no_run
//! use ironcorpus::*;
//! use ironcorpus::testing::MockEncoder;
//!
//! # fn main() -> anyhow::Result<()> {
//! let schema = FieldSchema::new(["title", "text"], "\n")?;
//! let reader = CorpusReader::open("collections/scifact/corpus.jsonl", schema)?;
//!
//! let encoder = MockEncoder::dense(768);
//! let writer = FlatIndexWriter::new("indexes/scifact.flat", 768);
//! let (summary, _) = encode_corpus(&reader, &encoder, writer, 64, ShardSpec::whole())?;
//! println!("encoded {} records in {} batches", summary.records, summary.batches);
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Records and field schemas
//!
//! A [`FieldSchema`] lists the fields to extract, in order, and the delimiter
//! used to split packed `contents`. See [`record`] for the exact rules,
//! including how a trailing delimiter is handled.
//!
//! ### Reader, shards and batches
//!
//! [`CorpusReader::open`] loads a file, a directory of files, or a glob
//! pattern into memory. [`CorpusReader::iterate`] yields the [`Batch`]es of one
//! [`ShardSpec`].
//!
//! ### Writers
//!
//! [`JsonlWriter`] and [`FlatIndexWriter`] implement
//! [`RepresentationWriter`], a three-state `Unopened → Open → Closed` contract.
//! [`ScopedWriter`] closes a writer on every exit path.
//!
//! ### Running
//!
//! [`encode_corpus`] drives one shard; [`run`] does the same from an
//! [`EncodeConfig`].
//!
//! ## Logging
//!
//! Ironcorpus emits [`tracing`] events (corpus load, shard progress, sink
//! close) and never installs a subscriber itself.

pub mod config;
pub mod encoder;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod reader;
pub mod record;
pub mod shard;
pub mod testing;
pub mod writer;

// General re-exports
pub use config::{EncodeConfig, OutputConfig};
pub use encoder::{
    DocumentEncoder, EncodeRequest, EncoderKind, EncoderRegistry, EncoderSpec, Representation,
    encoder_fn,
};
pub use error::{CorpusError, CorpusResult, LineLocation};
pub use pipeline::{EncodeSummary, encode_corpus, run, run_with_registry};
pub use reader::{Batch, BatchIter, CorpusReader, SourceFile};
pub use record::{FieldSchema, Record, parse_record};
pub use shard::ShardSpec;
pub use writer::{
    EmbeddingRecord, FlatIndex, FlatIndexWriter, Hit, JsonlWriter, Metric, RepresentationWriter,
    ScopedWriter, WriterState, read_docids, read_embeddings,
};
