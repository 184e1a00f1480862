//! Testing utilities for corpus encoding.
//!
//! - **Fixtures**: small corpora in both record layouts, written to temporary
//!   directories
//! - **Mock encoder**: a deterministic [`MockEncoder`] producing dense or
//!   sparse representations without any model runtime
//! - **Assertions**: checks for shard partitioning and batch shapes
//!
//! # Quick Start
//!
//! ```no_run
//! use ironcorpus::testing::*;
//! use ironcorpus::{CorpusReader, FieldSchema, JsonlWriter, ShardSpec, encode_corpus};
//!
//! # fn main() -> anyhow::Result<()> {
//! let corpus = TempCorpus::with_lines(&sample_packed_corpus())?;
//! let schema = FieldSchema::new(["title", "text"], "\n\n")?;
//! let reader = CorpusReader::open(corpus.path(), schema)?;
//!
//! let out = corpus.dir().join("embeddings");
//! let (summary, _) = encode_corpus(&reader, &MockEncoder::dense(4), JsonlWriter::new(&out), 2, ShardSpec::whole())?;
//! assert_eq!(summary.records, 3);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_encoder;

pub use assertions::*;
pub use fixtures::*;
pub use mock_encoder::*;
