//! The encoding driver: reader → encoder → writer, one batch at a time.
//!
//! The loop is synchronous and single-threaded. Parallelism comes from
//! running one process per shard, each with its own output directory; shard
//! outputs are merged afterwards by the caller.
//!
//! The writer is held by a [`ScopedWriter`], so it is closed (and its output
//! flushed) whether the run finishes or an encoder error aborts it.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::time::Instant;

use crate::config::{EncodeConfig, OutputConfig};
use crate::encoder::{DocumentEncoder, EncodeRequest, EncoderRegistry};
use crate::error::CorpusError;
use crate::reader::CorpusReader;
use crate::shard::ShardSpec;
use crate::writer::{RepresentationWriter, ScopedWriter};

/// Outcome of one encoding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodeSummary {
    pub shard: ShardSpec,
    pub batches: usize,
    pub records: usize,
    pub elapsed_ms: u64,
}

/// Encode one shard of `reader` into `writer`.
///
/// Returns the run summary and the closed writer.
///
/// # Errors
/// The first reader, encoder or writer failure. Encoder errors are not
/// retried. The writer is closed before the error is returned.
pub fn encode_corpus<E, W>(
    reader: &CorpusReader,
    encoder: &E,
    writer: W,
    batch_size: usize,
    shard: ShardSpec,
) -> Result<(EncodeSummary, W)>
where
    E: DocumentEncoder + ?Sized,
    W: RepresentationWriter,
{
    let started = Instant::now();
    let batches = reader.iterate(batch_size, shard)?;
    tracing::info!(
        %shard,
        encoder = encoder.name(),
        writer = writer.kind(),
        batches = batches.len(),
        batch_size,
        "encoding shard"
    );

    let mut scoped = ScopedWriter::open(writer).context("open representation writer")?;
    let mut summary = EncodeSummary {
        shard,
        batches: 0,
        records: 0,
        elapsed_ms: 0,
    };
    for (i, batch) in batches.enumerate() {
        let request = EncodeRequest::from_batch(&batch);
        let vectors = encoder
            .encode(&request)
            .with_context(|| format!("encode batch {i} (records {:?})", batch.range()))?;
        if vectors.len() != batch.len() {
            return Err(CorpusError::EncoderOutputMismatch {
                expected: batch.len(),
                actual: vectors.len(),
            }
            .into());
        }
        scoped
            .write(&batch, &vectors)
            .with_context(|| format!("write batch {i} (records {:?})", batch.range()))?;
        summary.batches += 1;
        summary.records += batch.len();
        tracing::debug!(batch = i, records = batch.len(), "batch written");
    }
    let writer = scoped.finish().context("close representation writer")?;

    summary.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        %shard,
        batches = summary.batches,
        records = summary.records,
        elapsed_ms = summary.elapsed_ms,
        "shard encoded"
    );
    Ok((summary, writer))
}

/// Run `config` end to end with an already constructed encoder.
///
/// # Errors
/// Invalid configuration, corpus load failures, and anything
/// [`encode_corpus`] returns.
pub fn run<E>(config: &EncodeConfig, encoder: &E) -> Result<EncodeSummary>
where
    E: DocumentEncoder + ?Sized,
{
    config.validate()?;
    if let OutputConfig::Flat { dimension, .. } = config.output
        && let Some(width) = encoder.dimension()
        && width != dimension
    {
        bail!(
            "encoder {} produces {width}-dimensional vectors but the flat index expects {dimension}",
            encoder.name()
        );
    }
    let reader = CorpusReader::open(&config.corpus, config.schema()?)
        .with_context(|| format!("load corpus {}", config.corpus.display()))?;
    let (summary, _writer) = encode_corpus(
        &reader,
        encoder,
        config.output.build(),
        config.batch_size,
        config.shard()?,
    )?;
    Ok(summary)
}

/// Run `config`, building the encoder from `registry`.
///
/// # Errors
/// A missing model name or unregistered kind, plus anything [`run`] returns.
pub fn run_with_registry(config: &EncodeConfig, registry: &EncoderRegistry) -> Result<EncodeSummary> {
    let spec = config
        .encoder_spec()?
        .context("encode config names no model")?;
    let encoder = registry.create(&spec)?;
    run(config, &*encoder)
}
