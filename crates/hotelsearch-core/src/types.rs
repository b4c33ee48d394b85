use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HotelSearchError, Result};

// =============================================================================
// Identifiers
// =============================================================================

/// Unique key of a record within a catalog (e.g. a hotel code).
///
/// Deserialization goes through [`RecordId::new`], so stored data cannot
/// smuggle in a blank id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Build an id, rejecting empty or whitespace-only keys.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(HotelSearchError::Validation(
                "record id must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RecordId {
    type Error = HotelSearchError;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the model/configuration that produced an embedding.
///
/// Embeddings carrying different versions are never compared.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmbedderVersion(String);

impl EmbedderVersion {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmbedderVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Records
// =============================================================================

/// A single field value: a scalar or an ordered list of strings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(serde_json::Number),
    List(Vec<String>),
}

impl FieldValue {
    /// Render the value as text. Lists are joined with single spaces.
    pub fn to_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => n.to_string(),
            FieldValue::List(items) => items.join(" "),
        }
    }

    fn from_json(field: &str, value: &Value) -> Result<Option<Self>> {
        let converted = match value {
            Value::Null => None,
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => Some(FieldValue::Number(n.clone())),
            Value::Array(items) => {
                let mut list = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::String(s) => list.push(s.clone()),
                        Value::Number(n) => list.push(n.to_string()),
                        Value::Bool(b) => list.push(b.to_string()),
                        Value::Null => {}
                        _ => {
                            return Err(HotelSearchError::Validation(format!(
                                "field '{}' contains a nested value",
                                field
                            )))
                        }
                    }
                }
                Some(FieldValue::List(list))
            }
            Value::Object(_) => {
                return Err(HotelSearchError::Validation(format!(
                    "field '{}' is an object; only scalars and string lists are supported",
                    field
                )))
            }
        };
        Ok(converted)
    }

    fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Number(n) => Value::Number(n.clone()),
            FieldValue::List(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        FieldValue::List(value.into_iter().map(String::from).collect())
    }
}

/// A catalog record: an id plus a field-name to value mapping.
///
/// Records are plain input data; derived state such as embeddings lives in
/// the catalog entry that wraps the record, never on the record itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Parse a raw JSON object, taking the id from `id_field`.
    ///
    /// String and integer ids are accepted. A missing, null, or blank id is
    /// a validation error. The id field is not duplicated into `fields`.
    pub fn from_json(value: &Value, id_field: &str) -> Result<Self> {
        let object = value.as_object().ok_or_else(|| {
            HotelSearchError::Validation("record must be a JSON object".to_string())
        })?;

        let id = match object.get(id_field) {
            Some(Value::String(s)) => RecordId::new(s.as_str())?,
            Some(Value::Number(n)) => RecordId::new(n.to_string())?,
            Some(Value::Null) | None => {
                return Err(HotelSearchError::Validation(format!(
                    "record is missing id field '{}'",
                    id_field
                )))
            }
            Some(other) => {
                return Err(HotelSearchError::Validation(format!(
                    "id field '{}' must be a string or integer, got {}",
                    id_field, other
                )))
            }
        };

        let mut fields = BTreeMap::new();
        for (name, raw) in object {
            if name == id_field {
                continue;
            }
            if let Some(value) = FieldValue::from_json(name, raw)? {
                fields.insert(name.clone(), value);
            }
        }

        Ok(Self { id, fields })
    }

    /// Render the selected fields as a JSON object (missing fields omitted).
    pub fn select_json(&self, names: &[String]) -> serde_json::Map<String, Value> {
        names
            .iter()
            .filter_map(|name| {
                self.fields
                    .get(name)
                    .map(|value| (name.clone(), value.to_json()))
            })
            .collect()
    }
}

// =============================================================================
// Embeddings
// =============================================================================

/// A dense vector tagged with the embedder version that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub values: Vec<f32>,
    pub version: EmbedderVersion,
    /// Digest of the text blob the vector was computed from, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_digest: Option<u64>,
}

impl Embedding {
    pub fn new(values: Vec<f32>, version: EmbedderVersion) -> Self {
        Self {
            values,
            version,
            source_digest: None,
        }
    }

    pub fn with_source_digest(mut self, digest: u64) -> Self {
        self.source_digest = Some(digest);
        self
    }

    pub fn dimensions(&self) -> usize {
        self.values.len()
    }

    /// True when every component is a finite float.
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
