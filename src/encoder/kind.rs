//! Encoder selection.
//!
//! Encoders are chosen from a closed set of [`EncoderKind`]s. A run names its
//! kind explicitly (`"tct_colbert"`, `"splade"`, ...) and the name is parsed
//! strictly. When no kind is given, [`EncoderKind::guess`] infers one from the
//! model name with ordered rules, falling back to [`EncoderKind::Auto`].
//! Guessing is a convenience for callers and never used once a kind is set.
//!
//! Constructors live in an [`EncoderRegistry`]; this crate ships none, since
//! every real encoder wraps an external model runtime.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use super::DocumentEncoder;

/// Closed set of supported document encoder families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EncoderKind {
    Dpr,
    CosDpr,
    TctColbert,
    Aggretriever,
    Ance,
    SentenceTransformers,
    Contriever,
    Auto,
    OpenAi,
    Clip,
    Arctic,
    UniCoil,
    Splade,
}

impl EncoderKind {
    pub const ALL: [EncoderKind; 13] = [
        EncoderKind::Dpr,
        EncoderKind::CosDpr,
        EncoderKind::TctColbert,
        EncoderKind::Aggretriever,
        EncoderKind::Ance,
        EncoderKind::SentenceTransformers,
        EncoderKind::Contriever,
        EncoderKind::Auto,
        EncoderKind::OpenAi,
        EncoderKind::Clip,
        EncoderKind::Arctic,
        EncoderKind::UniCoil,
        EncoderKind::Splade,
    ];

    /// Canonical name accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            EncoderKind::Dpr => "dpr",
            EncoderKind::CosDpr => "cosdpr",
            EncoderKind::TctColbert => "tct_colbert",
            EncoderKind::Aggretriever => "aggretriever",
            EncoderKind::Ance => "ance",
            EncoderKind::SentenceTransformers => "sentence-transformers",
            EncoderKind::Contriever => "contriever",
            EncoderKind::Auto => "auto",
            EncoderKind::OpenAi => "openai-api",
            EncoderKind::Clip => "clip",
            EncoderKind::Arctic => "arctic",
            EncoderKind::UniCoil => "unicoil",
            EncoderKind::Splade => "splade",
        }
    }

    /// Learned sparse encoders emit term weights instead of dense vectors.
    pub fn is_sparse(self) -> bool {
        matches!(self, EncoderKind::UniCoil | EncoderKind::Splade)
    }

    /// Pooling a model of this family is trained with.
    pub fn default_pooling(self) -> Pooling {
        match self {
            EncoderKind::SentenceTransformers | EncoderKind::Contriever => Pooling::Mean,
            _ => Pooling::Cls,
        }
    }

    /// Whether vectors of this family are L2-normalized by default.
    pub fn default_l2_norm(self) -> bool {
        matches!(
            self,
            EncoderKind::SentenceTransformers | EncoderKind::CosDpr | EncoderKind::Arctic
        )
    }

    /// Infer a kind from a model name such as `castorini/tct_colbert-v2-msmarco`.
    ///
    /// Rules are tried in order and the first match wins. `cosdpr` is checked
    /// before `dpr`, and `clip` before `openai` (`openai/clip-vit-base-patch32`).
    pub fn guess(model: &str) -> Self {
        GUESS_RULES
            .iter()
            .find(|(pattern, _)| pattern.is_match(model))
            .map_or(EncoderKind::Auto, |(_, kind)| *kind)
    }
}

const GUESS_PATTERNS: [(&str, EncoderKind); 12] = [
    (r"(?i)cosdpr", EncoderKind::CosDpr),
    (r"(?i)dpr", EncoderKind::Dpr),
    (r"(?i)tct[_-]?colbert", EncoderKind::TctColbert),
    (r"(?i)aggretriever", EncoderKind::Aggretriever),
    (r"(?i)(^|[^a-z])ance([^a-z]|$)", EncoderKind::Ance),
    (r"(?i)sentence-transformers", EncoderKind::SentenceTransformers),
    (r"(?i)unicoil", EncoderKind::UniCoil),
    (r"(?i)splade", EncoderKind::Splade),
    (r"(?i)clip", EncoderKind::Clip),
    (r"(?i)openai|text-embedding-", EncoderKind::OpenAi),
    (r"(?i)contriever", EncoderKind::Contriever),
    (r"(?i)arctic", EncoderKind::Arctic),
];

static GUESS_RULES: LazyLock<Vec<(Regex, EncoderKind)>> = LazyLock::new(|| {
    GUESS_PATTERNS
        .into_iter()
        .filter_map(|(pattern, kind)| Regex::new(pattern).ok().map(|re| (re, kind)))
        .collect()
});

impl fmt::Display for EncoderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown encoder kind name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown encoder kind {0:?}")]
pub struct UnknownEncoderKind(pub String);

impl FromStr for EncoderKind {
    type Err = UnknownEncoderKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EncoderKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| UnknownEncoderKind(s.to_string()))
    }
}

impl TryFrom<String> for EncoderKind {
    type Error = UnknownEncoderKind;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<EncoderKind> for String {
    fn from(kind: EncoderKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Token pooling strategy for transformer encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    Cls,
    Mean,
}

/// Everything a factory needs to build an encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSpec {
    pub kind: EncoderKind,
    pub model: String,
    pub pooling: Pooling,
    pub l2_norm: bool,
}

impl EncoderSpec {
    /// Resolve the kind (explicit name first, model-name guess otherwise) and
    /// fill in that kind's defaults.
    ///
    /// # Errors
    /// [`UnknownEncoderKind`] if `kind` is given but names no kind.
    pub fn resolve(kind: Option<&str>, model: impl Into<String>) -> Result<Self, UnknownEncoderKind> {
        let model = model.into();
        let kind = match kind {
            Some(name) => name.parse()?,
            None => EncoderKind::guess(&model),
        };
        Ok(Self::new(kind, model))
    }

    pub fn new(kind: EncoderKind, model: impl Into<String>) -> Self {
        Self {
            kind,
            model: model.into(),
            pooling: kind.default_pooling(),
            l2_norm: kind.default_l2_norm(),
        }
    }
}

/// Boxed encoder as produced by a factory.
pub type BoxedEncoder = Box<dyn DocumentEncoder + Send + Sync>;

/// Constructor registered for one kind.
pub type EncoderFactory = Box<dyn Fn(&EncoderSpec) -> anyhow::Result<BoxedEncoder> + Send + Sync>;

/// Map from encoder kind to constructor.
#[derive(Default)]
pub struct EncoderRegistry {
    factories: HashMap<EncoderKind, EncoderFactory>,
}

impl EncoderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register<F>(&mut self, kind: EncoderKind, factory: F) -> &mut Self
    where
        F: Fn(&EncoderSpec) -> anyhow::Result<BoxedEncoder> + Send + Sync + 'static,
    {
        self.factories.insert(kind, Box::new(factory));
        self
    }

    pub fn contains(&self, kind: EncoderKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Registered kinds in canonical order.
    pub fn kinds(&self) -> Vec<EncoderKind> {
        let mut kinds: Vec<_> = self.factories.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build an encoder for `spec`.
    ///
    /// # Errors
    /// Fails when no constructor is registered for the kind, or the
    /// constructor itself fails.
    pub fn create(&self, spec: &EncoderSpec) -> anyhow::Result<BoxedEncoder> {
        let factory = self.factories.get(&spec.kind).ok_or_else(|| {
            anyhow::anyhow!("no encoder registered for kind {}", spec.kind)
        })?;
        tracing::debug!(kind = %spec.kind, model = %spec.model, "creating encoder");
        factory(spec)
    }
}

impl fmt::Debug for EncoderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncoderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
