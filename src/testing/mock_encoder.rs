//! A deterministic stand-in for a model-backed encoder.

use anyhow::{Result, bail};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::encoder::{DocumentEncoder, EncodeRequest, Representation};

/// Encodes text from its bytes alone, so equal inputs always give equal
/// outputs.
///
/// Dense mode folds the UTF-8 bytes of `title + " " + text` into a vector of
/// the configured width. Sparse mode counts lower-cased whitespace tokens.
#[derive(Debug)]
pub struct MockEncoder {
    dimension: Option<usize>,
    fail_on_call: Option<usize>,
    calls: AtomicUsize,
}

impl MockEncoder {
    #[must_use]
    pub fn dense(dimension: usize) -> Self {
        Self {
            dimension: Some(dimension),
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn sparse() -> Self {
        Self {
            dimension: None,
            fail_on_call: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Fail the `call`-th invocation (0-based) of [`DocumentEncoder::encode`].
    #[must_use]
    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of `encode` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The text the encoder sees for row `row`.
    #[must_use]
    pub fn input_text(request: &EncodeRequest<'_>, row: usize) -> String {
        match request.titles {
            Some(titles) => format!("{} {}", titles[row], request.texts[row]),
            None => request.texts[row].clone(),
        }
    }

    /// Dense vector for `text`: byte `i` is added to slot `i % dimension`.
    #[must_use]
    pub fn dense_vector(text: &str, dimension: usize) -> Vec<f32> {
        let mut v = vec![0.0f32; dimension];
        if dimension == 0 {
            return v;
        }
        for (i, b) in text.bytes().enumerate() {
            v[i % dimension] += f32::from(b) / 255.0;
        }
        v
    }

    /// Term counts of `text`.
    #[must_use]
    pub fn sparse_vector(text: &str) -> BTreeMap<String, f32> {
        let mut weights = BTreeMap::new();
        for token in text.split_whitespace() {
            *weights.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
        }
        weights
    }
}

impl DocumentEncoder for MockEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<Vec<Representation>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_call == Some(call) {
            bail!("mock encoder failure on call {call}");
        }
        Ok((0..request.len())
            .map(|row| {
                let text = Self::input_text(request, row);
                match self.dimension {
                    Some(d) => Representation::Dense(Self::dense_vector(&text, d)),
                    None => Representation::Sparse(Self::sparse_vector(&text)),
                }
            })
            .collect())
    }

    fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn name(&self) -> &str {
        "mock"
    }
}
