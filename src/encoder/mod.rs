//! The encoder port: how the pipeline hands a batch to a model and what it
//! expects back.
//!
//! Model inference lives outside this crate. An encoder receives the field
//! columns of one batch as an [`EncodeRequest`] and must return exactly one
//! [`Representation`] per row, in row order. Encoder failures are not
//! retried; they abort the run. Encoding is assumed deterministic, so a
//! failed run can simply be started again.
//!
//! [`encoder_fn`] turns a closure into an encoder, which is handy for tests
//! and for thin adapters around an external runtime:
//!
//! ```
//! use ironcorpus::encoder::{DocumentEncoder, Representation, encoder_fn};
//!
//! let lengths = encoder_fn("lengths", |req| {
//!     Ok(req.texts.iter().map(|t| Representation::Dense(vec![t.len() as f32])).collect())
//! });
//! assert_eq!(lengths.name(), "lengths");
//! ```

pub mod kind;

pub use kind::{BoxedEncoder, EncoderKind, EncoderRegistry, EncoderSpec, Pooling, UnknownEncoderKind};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::reader::Batch;

/// Output of an encoder for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Representation {
    /// Dense vector, serialized as a plain JSON array.
    Dense(Vec<f32>),
    /// Term to weight map from a learned sparse model, serialized as a JSON object.
    Sparse(BTreeMap<String, f32>),
}

impl Representation {
    pub fn kind(&self) -> &'static str {
        match self {
            Representation::Dense(_) => "dense",
            Representation::Sparse(_) => "sparse",
        }
    }

    /// Width of a dense vector; `None` for sparse maps.
    pub fn dimension(&self) -> Option<usize> {
        match self {
            Representation::Dense(v) => Some(v.len()),
            Representation::Sparse(_) => None,
        }
    }

    pub fn as_dense(&self) -> Option<&[f32]> {
        match self {
            Representation::Dense(v) => Some(v),
            Representation::Sparse(_) => None,
        }
    }
}

impl From<Vec<f32>> for Representation {
    fn from(v: Vec<f32>) -> Self {
        Representation::Dense(v)
    }
}

impl From<BTreeMap<String, f32>> for Representation {
    fn from(m: BTreeMap<String, f32>) -> Self {
        Representation::Sparse(m)
    }
}

/// Input handed to an encoder for one batch. All columns have equal length.
#[derive(Debug, Clone)]
pub struct EncodeRequest<'a> {
    /// Main text column: the `text` field, or the last requested field when
    /// the schema has no `text`.
    pub texts: &'a [String],
    /// The `title` column when the schema requests one. Encoders that support
    /// it prefix each text with its title.
    pub titles: Option<&'a [String]>,
    /// Every requested field, in schema order.
    pub fields: Vec<(&'a str, &'a [String])>,
}

impl<'a> EncodeRequest<'a> {
    pub fn from_batch(batch: &Batch<'a>) -> Self {
        let fields: Vec<(&'a str, &'a [String])> = batch.fields().collect();
        let texts = batch
            .field("text")
            .or_else(|| fields.last().map(|(_, values)| *values))
            .unwrap_or_default();
        Self {
            texts,
            titles: batch.field("title"),
            fields,
        }
    }

    pub fn len(&self) -> usize {
        self.texts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<&'a [String]> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, values)| *values)
    }
}

/// A document encoder.
pub trait DocumentEncoder {
    /// Encode every row of `request`, returning one representation per row.
    ///
    /// # Errors
    /// Any model failure. The pipeline propagates it unchanged.
    fn encode(&self, request: &EncodeRequest<'_>) -> anyhow::Result<Vec<Representation>>;

    /// Fixed output width of a dense encoder, when known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }

    fn name(&self) -> &str {
        "encoder"
    }
}

/// Adapter turning a closure into a [`DocumentEncoder`]; see [`encoder_fn`].
pub struct FnEncoder<F> {
    name: String,
    f: F,
}

/// Wrap a closure as an encoder.
pub fn encoder_fn<F>(name: impl Into<String>, f: F) -> FnEncoder<F>
where
    F: Fn(&EncodeRequest<'_>) -> anyhow::Result<Vec<Representation>>,
{
    FnEncoder {
        name: name.into(),
        f,
    }
}

impl<F> DocumentEncoder for FnEncoder<F>
where
    F: Fn(&EncodeRequest<'_>) -> anyhow::Result<Vec<Representation>>,
{
    fn encode(&self, request: &EncodeRequest<'_>) -> anyhow::Result<Vec<Representation>> {
        (self.f)(request)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
