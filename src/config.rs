//! Run configuration.
//!
//! An [`EncodeConfig`] describes one encoding run: which corpus, which
//! fields, which shard, how large the batches are, and where the
//! representations go. It deserializes from JSON so runs can be stored next
//! to their outputs and replayed exactly:
//!
//! ```json
//! {
//!   "corpus": "collections/nfcorpus/corpus.jsonl",
//!   "fields": ["title", "text"],
//!   "delimiter": "\n",
//!   "batch_size": 32,
//!   "shard_id": 0,
//!   "shard_count": 4,
//!   "encoder": "contriever",
//!   "model": "facebook/contriever-msmarco",
//!   "output": { "format": "flat", "dir": "indexes/nfcorpus.contriever.0", "dimension": 768 }
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoder::EncoderSpec;
use crate::record::FieldSchema;
use crate::shard::ShardSpec;
use crate::writer::{FlatIndexWriter, JsonlWriter, Metric, RepresentationWriter};

/// Where and how representations are persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum OutputConfig {
    /// `embeddings.jsonl` inside `dir`.
    Jsonl { dir: PathBuf },
    /// `docid` + `index` inside `dir`.
    Flat {
        dir: PathBuf,
        dimension: usize,
        #[serde(default)]
        metric: Metric,
    },
}

impl OutputConfig {
    pub fn dir(&self) -> &Path {
        match self {
            OutputConfig::Jsonl { dir } | OutputConfig::Flat { dir, .. } => dir,
        }
    }

    /// Construct the (unopened) writer this output describes.
    pub fn build(&self) -> Box<dyn RepresentationWriter> {
        match self {
            OutputConfig::Jsonl { dir } => Box::new(JsonlWriter::new(dir)),
            OutputConfig::Flat {
                dir,
                dimension,
                metric,
            } => Box::new(FlatIndexWriter::with_metric(dir, *dimension, *metric)),
        }
    }
}

/// Configuration of one encoding run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Corpus file, directory, or glob pattern.
    pub corpus: PathBuf,
    /// Fields to extract, in order.
    pub fields: Vec<String>,
    /// Separator of packed `contents`.
    pub delimiter: String,
    /// Only key consulted for ids; `id`/`docid` when unset.
    pub id_field: Option<String>,
    pub batch_size: usize,
    pub shard_id: usize,
    pub shard_count: usize,
    /// Explicit encoder kind name, e.g. `"tct_colbert"`.
    pub encoder: Option<String>,
    /// Model name, used to guess the kind when `encoder` is unset.
    pub model: Option<String>,
    pub output: OutputConfig,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("corpus"),
            fields: vec!["text".to_string()],
            delimiter: "\n".to_string(),
            id_field: None,
            batch_size: 64,
            shard_id: 0,
            shard_count: 1,
            encoder: None,
            model: None,
            output: OutputConfig::Jsonl {
                dir: PathBuf::from("embeddings"),
            },
        }
    }
}

impl EncodeConfig {
    /// Load a configuration from a JSON file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or fails
    /// [`validate`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse encode config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save as pretty JSON, creating parent directories as needed.
    ///
    /// # Errors
    /// Returns an error if the file or its parent directory cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
        }
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("write {}", path.display()))
    }

    /// # Errors
    /// Describes the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if let OutputConfig::Flat { dimension: 0, .. } = self.output {
            bail!("flat output needs a dimension of at least 1");
        }
        self.schema()?;
        self.shard()?;
        Ok(())
    }

    /// # Errors
    /// Returns an error for an invalid field list or delimiter.
    pub fn schema(&self) -> Result<FieldSchema> {
        let schema = FieldSchema::new(self.fields.iter().cloned(), self.delimiter.clone())?;
        Ok(match &self.id_field {
            Some(key) => schema.with_id_field(key.clone()),
            None => schema,
        })
    }

    /// # Errors
    /// Returns an error unless `shard_id < shard_count`.
    pub fn shard(&self) -> Result<ShardSpec> {
        Ok(ShardSpec::new(self.shard_id, self.shard_count)?)
    }

    /// Encoder to build for this run, if a model is configured.
    ///
    /// # Errors
    /// Returns an error if `encoder` names no known kind.
    pub fn encoder_spec(&self) -> Result<Option<EncoderSpec>> {
        match (&self.model, &self.encoder) {
            (Some(model), kind) => Ok(Some(EncoderSpec::resolve(kind.as_deref(), model.clone())?)),
            (None, Some(kind)) => {
                bail!("encoder kind {kind:?} configured without a model name")
            }
            (None, None) => Ok(None),
        }
    }
}
