//! Record parsing: turning one corpus line into an id plus ordered field values.
//!
//! Corpora come in two incompatible layouts, and both must be accepted:
//!
//! - **Explicit fields**: every requested field is its own key, e.g.
//!   `{"id": "d1", "title": "T", "text": "B"}`.
//! - **Packed contents**: a single `contents` string holds all fields joined by
//!   the schema delimiter, e.g. `{"id": "d1", "contents": "T\n\nB"}`.
//!
//! Explicit keys win whenever *all* requested fields are present; otherwise the
//! record must carry `contents`.
//!
//! # Trailing delimiter
//! Some producers terminate packed contents with the delimiter (`"T\n\nB\n\n"`).
//! Exactly one trailing delimiter is dropped, and only when the delimiter occurs
//! once per requested field, i.e. only when dropping it restores the expected
//! field count. A title-only document `"T\n\n"` therefore still parses to
//! `("T", "")` for a two-field schema.

use serde_json::{Map, Value};

use crate::error::{CorpusError, CorpusResult, LineLocation};

/// Keys consulted for the document id when no explicit id field is configured.
pub const DEFAULT_ID_KEYS: [&str; 2] = ["id", "docid"];

/// Key holding packed field values.
pub const CONTENTS_KEY: &str = "contents";

/// Ordered field names to extract per record, plus the packed-field delimiter.
///
/// Fixed for the lifetime of a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    fields: Vec<String>,
    delimiter: String,
    id_field: Option<String>,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self {
            fields: vec!["text".to_string()],
            delimiter: "\n".to_string(),
            id_field: None,
        }
    }
}

impl FieldSchema {
    /// Build a schema from field names and a delimiter.
    ///
    /// # Errors
    /// Returns [`CorpusError::InvalidConfig`] if no fields are given, a field
    /// name repeats or is `id`, or the delimiter is empty.
    pub fn new<I, S>(fields: I, delimiter: impl Into<String>) -> CorpusResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        let delimiter = delimiter.into();
        if fields.is_empty() {
            return Err(CorpusError::InvalidConfig(
                "field schema needs at least one field".into(),
            ));
        }
        if delimiter.is_empty() {
            return Err(CorpusError::InvalidConfig("delimiter must not be empty".into()));
        }
        for (i, name) in fields.iter().enumerate() {
            if name == "id" {
                return Err(CorpusError::InvalidConfig(
                    "`id` is reserved and cannot be a requested field".into(),
                ));
            }
            if fields[..i].contains(name) {
                return Err(CorpusError::InvalidConfig(format!(
                    "field `{name}` requested twice"
                )));
            }
        }
        Ok(Self {
            fields,
            delimiter,
            id_field: None,
        })
    }

    /// Read the id from `key` only, instead of `id` falling back to `docid`.
    #[must_use]
    pub fn with_id_field(mut self, key: impl Into<String>) -> Self {
        self.id_field = Some(key.into());
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn id_field(&self) -> Option<&str> {
        self.id_field.as_deref()
    }

    /// Keys consulted for the id, in lookup order.
    pub fn id_keys(&self) -> Vec<String> {
        id_keys(self.id_field())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Position of `name` in the schema.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }
}

/// One parsed document: its id and the field values in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: String,
    pub fields: Vec<String>,
}

impl Record {
    /// Field values joined by a newline, as stored in embedding records.
    pub fn contents(&self) -> String {
        self.fields.join("\n")
    }
}

/// Parse one corpus line into a [`Record`].
///
/// # Errors
/// - [`CorpusError::MalformedRecord`] if the line is not a JSON object or has
///   neither the explicit fields nor `contents`.
/// - [`CorpusError::DuplicateOrMissingId`] if no id can be resolved.
/// - [`CorpusError::FieldCountMismatch`] if packed contents split badly.
pub fn parse_record(
    line: &str,
    schema: &FieldSchema,
    location: &LineLocation,
) -> CorpusResult<Record> {
    let value: Value = serde_json::from_str(line).map_err(|e| CorpusError::MalformedRecord {
        location: location.clone(),
        reason: format!("invalid JSON: {e}"),
    })?;
    let Value::Object(obj) = value else {
        return Err(CorpusError::MalformedRecord {
            location: location.clone(),
            reason: "expected a JSON object".into(),
        });
    };
    let id = resolve_id(&obj, schema.id_field(), location)?;
    let fields = parse_fields(&obj, schema, location)?;
    Ok(Record { id, fields })
}

/// Resolve the document id, coercing integers to strings.
///
/// With `id_field` set only that key is read; otherwise `id` is preferred and
/// `docid` is the legacy fallback. A `null` id counts as missing.
///
/// # Errors
/// [`CorpusError::DuplicateOrMissingId`] when no id is present, and
/// [`CorpusError::MalformedRecord`] when the id is neither string nor number.
pub fn resolve_id(
    obj: &Map<String, Value>,
    id_field: Option<&str>,
    location: &LineLocation,
) -> CorpusResult<String> {
    let found = match id_field {
        Some(key) => obj.get(key),
        None => DEFAULT_ID_KEYS.iter().find_map(|key| obj.get(*key)),
    };
    match found {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        None | Some(Value::Null) => Err(CorpusError::DuplicateOrMissingId {
            id: None,
            keys: id_keys(id_field),
            location: location.clone(),
        }),
        Some(other) => Err(CorpusError::MalformedRecord {
            location: location.clone(),
            reason: format!("id must be a string or integer, found {other}"),
        }),
    }
}

fn id_keys(id_field: Option<&str>) -> Vec<String> {
    match id_field {
        Some(key) => vec![key.to_string()],
        None => DEFAULT_ID_KEYS.iter().map(|k| (*k).to_string()).collect(),
    }
}

/// Resolve the requested field values of one record, in schema order.
///
/// # Errors
/// See [`parse_record`].
pub fn parse_fields(
    obj: &Map<String, Value>,
    schema: &FieldSchema,
    location: &LineLocation,
) -> CorpusResult<Vec<String>> {
    if schema.fields().iter().all(|f| obj.contains_key(f)) {
        return schema
            .fields()
            .iter()
            .map(|f| {
                let value = string_value(obj, f, location)?;
                Ok(value.strip_suffix(' ').unwrap_or(value).to_string())
            })
            .collect();
    }

    if !obj.contains_key(CONTENTS_KEY) {
        let missing: Vec<&str> = schema
            .fields()
            .iter()
            .filter(|f| !obj.contains_key(f.as_str()))
            .map(String::as_str)
            .collect();
        return Err(CorpusError::MalformedRecord {
            location: location.clone(),
            reason: format!(
                "missing fields [{}] and no `{CONTENTS_KEY}` to split",
                missing.join(", ")
            ),
        });
    }
    let contents = string_value(obj, CONTENTS_KEY, location)?;
    split_packed(contents, schema, location)
}

/// Split packed `contents` into exactly `schema.len()` pieces.
///
/// # Errors
/// [`CorpusError::FieldCountMismatch`] if the piece count is wrong after the
/// trailing-delimiter adjustment.
pub fn split_packed(
    contents: &str,
    schema: &FieldSchema,
    location: &LineLocation,
) -> CorpusResult<Vec<String>> {
    let expected = schema.len();
    let delimiter = schema.delimiter();

    let mut body = contents;
    if body.matches(delimiter).count() == expected
        && let Some(stripped) = body.strip_suffix(delimiter)
    {
        body = stripped;
    }

    let pieces: Vec<String> = body
        .split(delimiter)
        .map(|piece| piece.trim_matches(' ').to_string())
        .collect();
    if pieces.len() != expected {
        return Err(CorpusError::FieldCountMismatch {
            location: location.clone(),
            expected,
            actual: pieces.len(),
        });
    }
    Ok(pieces)
}

fn string_value<'a>(
    obj: &'a Map<String, Value>,
    key: &str,
    location: &LineLocation,
) -> CorpusResult<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(CorpusError::MalformedRecord {
            location: location.clone(),
            reason: format!("`{key}` must be a string, found {other}"),
        }),
        None => Err(CorpusError::MalformedRecord {
            location: location.clone(),
            reason: format!("`{key}` is missing"),
        }),
    }
}
