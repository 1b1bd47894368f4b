use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ValidationError, ValidationReason};

pub type Document = String;
pub type Embedding = Vec<EmbeddingValue>;
pub type Metadata = BTreeMap<String, MetadataValue>;

/// One element of an embedding vector.
///
/// Integers and floats are kept as the caller sent them; `[1, 2]` and
/// `[1.0, 2.0]` are both accepted but are not rewritten into one another.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingValue {
    Int(i64),
    Float(f64),
}

impl EmbeddingValue {
    /// Accepts a JSON number; anything else is `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        let serde_json::Value::Number(number) = value else {
            return None;
        };
        if let Some(i) = number.as_i64() {
            Some(EmbeddingValue::Int(i))
        } else {
            number.as_f64().map(EmbeddingValue::Float)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            EmbeddingValue::Int(i) => *i as f64,
            EmbeddingValue::Float(f) => *f,
        }
    }
}

/// Scalar allowed as a metadata value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Null,
}

impl MetadataValue {
    /// Accepts a JSON scalar; arrays and objects are `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;
        match value {
            Value::Null => Some(MetadataValue::Null),
            Value::Bool(b) => Some(MetadataValue::Bool(*b)),
            Value::String(s) => Some(MetadataValue::Str(s.clone())),
            Value::Number(_) => EmbeddingValue::from_json(value).map(|n| match n {
                EmbeddingValue::Int(i) => MetadataValue::Int(i),
                EmbeddingValue::Float(f) => MetadataValue::Float(f),
            }),
            Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Equality that treats `1` and `1.0` as the same number.
    pub fn loosely_eq(&self, other: &MetadataValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Numeric view used for range comparisons; `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetadataValue::Int(i) => Some(*i as f64),
            MetadataValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetadataValue::Bool(_) => "bool",
            MetadataValue::Int(_) => "integer",
            MetadataValue::Float(_) => "float",
            MetadataValue::Str(_) => "string",
            MetadataValue::Null => "null",
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Str(value.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        MetadataValue::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

/// Selects which optional fields to include in query/get responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncludeField {
    Embeddings,
    Metadatas,
    Documents,
    Distances,
}

impl IncludeField {
    pub const ALL: [IncludeField; 4] = [
        IncludeField::Embeddings,
        IncludeField::Metadatas,
        IncludeField::Documents,
        IncludeField::Distances,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IncludeField::Embeddings => "embeddings",
            IncludeField::Metadatas => "metadatas",
            IncludeField::Documents => "documents",
            IncludeField::Distances => "distances",
        }
    }
}

impl fmt::Display for IncludeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncludeField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncludeField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                ValidationError::new("include", ValidationReason::UnknownValue(s.to_string()))
            })
    }
}

/// Set of [`IncludeField`]s. Ids are always returned and are not part of the set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Include {
    embeddings: bool,
    metadatas: bool,
    documents: bool,
    distances: bool,
}

impl Include {
    /// Nothing but ids.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self::from_fields(IncludeField::ALL)
    }

    /// `{metadatas, documents, distances}`
    pub fn default_get() -> Self {
        Self::from_fields([
            IncludeField::Metadatas,
            IncludeField::Documents,
            IncludeField::Distances,
        ])
    }

    /// `{metadatas, documents, distances}`
    pub fn default_query() -> Self {
        Self::default_get()
    }

    pub fn from_fields<I>(fields: I) -> Self
    where
        I: IntoIterator<Item = IncludeField>,
    {
        let mut include = Self::none();
        for field in fields {
            include.insert(field);
        }
        include
    }

    pub fn insert(&mut self, field: IncludeField) {
        *self.slot(field) = true;
    }

    pub fn contains(&self, field: IncludeField) -> bool {
        match field {
            IncludeField::Embeddings => self.embeddings,
            IncludeField::Metadatas => self.metadatas,
            IncludeField::Documents => self.documents,
            IncludeField::Distances => self.distances,
        }
    }

    /// Selected fields in canonical order.
    pub fn fields(&self) -> Vec<IncludeField> {
        IncludeField::ALL
            .into_iter()
            .filter(|f| self.contains(*f))
            .collect()
    }

    fn slot(&mut self, field: IncludeField) -> &mut bool {
        match field {
            IncludeField::Embeddings => &mut self.embeddings,
            IncludeField::Metadatas => &mut self.metadatas,
            IncludeField::Documents => &mut self.documents,
            IncludeField::Distances => &mut self.distances,
        }
    }
}

impl Serialize for Include {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.fields())
    }
}

/// One record assembled from the parallel arrays of an add/update request.
///
/// An absent array and a `null` element at this position both come out as `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Option<Embedding>,
    pub metadata: Option<Metadata>,
    pub document: Option<Document>,
}

/// Collection handle returned by create/get collection calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

/// Result shape for similarity queries: one inner list per query embedding.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub ids: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Vec<Option<Embedding>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Vec<Option<Metadata>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Vec<Option<Document>>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distances: Option<Vec<Vec<f64>>>,
}

/// Result shape for get calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GetResult {
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Option<Vec<Option<Embedding>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Option<Vec<Option<Metadata>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Option<Document>>>,
}
