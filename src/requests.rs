//! Typed operation requests and the parsers that build them from raw payloads.
//!
//! Every `parse*` constructor either returns a request whose invariants hold or a
//! [`ValidationError`] naming the offending field. Filters (`where`,
//! `where_document`) are only checked to be JSON objects here.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::SchemaConfig;
use crate::error::{ValidationError, ValidationReason};
use crate::filters::{WhereClause, WhereDocument};
use crate::meta::{CollectionNames, FieldNames};
use crate::types::{
    Document, Embedding, EmbeddingRecord, EmbeddingValue, Include, IncludeField, Metadata,
    MetadataValue,
};

type Parsed<T> = std::result::Result<T, ValidationError>;

/// Parallel arrays with per-entry nullability.
pub type Parallel<T> = Option<Vec<Option<T>>>;

/// Records to insert. Ids are caller-assigned; duplicates are a storage concern.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AddRequest {
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Parallel<Embedding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Parallel<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Parallel<Document>,
}

/// Partial update of existing records; a `None` entry leaves that field unchanged.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UpdateRequest {
    pub ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embeddings: Parallel<Embedding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadatas: Parallel<Metadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Parallel<Document>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeleteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_meta: Option<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_meta: Option<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
    /// Metadata key to order by. Not checked against stored keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    pub include: Include,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryRequest {
    pub query_embeddings: Vec<Embedding>,
    pub n_results: u32,
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    pub where_meta: Option<WhereClause>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub where_document: Option<WhereDocument>,
    pub include: Include,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub get_or_create: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CollectionUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_metadata: Option<Metadata>,
}

struct RecordBatch {
    ids: Vec<String>,
    embeddings: Parallel<Embedding>,
    metadatas: Parallel<Metadata>,
    documents: Parallel<Document>,
}

impl RecordBatch {
    fn parse(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let payload = Payload::new(payload)?;

        let ids = payload
            .string_list(FieldNames::IDS)?
            .ok_or_else(|| ValidationError::missing(FieldNames::IDS))?;
        if ids.is_empty() {
            return Err(ValidationError::new(FieldNames::IDS, ValidationReason::Empty));
        }
        check_batch(config, FieldNames::IDS, ids.len())?;

        let embeddings = payload.nullable_list(FieldNames::EMBEDDINGS, parse_embedding)?;
        let metadatas = payload.nullable_list(FieldNames::METADATAS, parse_metadata)?;
        let documents = payload.nullable_list(FieldNames::DOCUMENTS, parse_document)?;

        check_parallel(FieldNames::EMBEDDINGS, ids.len(), embeddings.as_deref())?;
        check_parallel(FieldNames::METADATAS, ids.len(), metadatas.as_deref())?;
        check_parallel(FieldNames::DOCUMENTS, ids.len(), documents.as_deref())?;

        Ok(Self {
            ids,
            embeddings,
            metadatas,
            documents,
        })
    }
}

impl AddRequest {
    /// Parse against the process-wide [`SchemaConfig`].
    pub fn parse(payload: &Value) -> Parsed<Self> {
        Self::parse_with(payload, SchemaConfig::global())
    }

    pub fn parse_with(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let RecordBatch {
            ids,
            embeddings,
            metadatas,
            documents,
        } = RecordBatch::parse(payload, config)?;
        Ok(Self {
            ids,
            embeddings,
            metadatas,
            documents,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn records(&self) -> Vec<EmbeddingRecord> {
        assemble(
            &self.ids,
            self.embeddings.as_deref(),
            self.metadatas.as_deref(),
            self.documents.as_deref(),
        )
    }
}

impl UpdateRequest {
    /// Parse against the process-wide [`SchemaConfig`].
    pub fn parse(payload: &Value) -> Parsed<Self> {
        Self::parse_with(payload, SchemaConfig::global())
    }

    pub fn parse_with(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let RecordBatch {
            ids,
            embeddings,
            metadatas,
            documents,
        } = RecordBatch::parse(payload, config)?;
        Ok(Self {
            ids,
            embeddings,
            metadatas,
            documents,
        })
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Per-id changes; `None` fields are left untouched by the engine.
    pub fn records(&self) -> Vec<EmbeddingRecord> {
        assemble(
            &self.ids,
            self.embeddings.as_deref(),
            self.metadatas.as_deref(),
            self.documents.as_deref(),
        )
    }
}

impl DeleteRequest {
    /// Parse against the process-wide [`SchemaConfig`].
    pub fn parse(payload: &Value) -> Parsed<Self> {
        Self::parse_with(payload, SchemaConfig::global())
    }

    pub fn parse_with(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let payload = Payload::new(payload)?;
        let request = Self {
            ids: payload.capped_string_list(FieldNames::IDS, config)?,
            where_meta: payload.object(FieldNames::WHERE)?.map(WhereClause),
            where_document: payload
                .object(FieldNames::WHERE_DOCUMENT)?
                .map(WhereDocument),
        };

        // An entirely empty delete is ambiguous; `"where": {}` is the explicit form
        // for "every record".
        if request.ids.is_none() && request.where_meta.is_none() && request.where_document.is_none()
        {
            return Err(ValidationError::new(
                FieldNames::BODY,
                ValidationReason::Invalid(
                    "delete requires at least one of ids, where, where_document".into(),
                ),
            ));
        }

        Ok(request)
    }
}

impl GetRequest {
    /// Parse against the process-wide [`SchemaConfig`].
    pub fn parse(payload: &Value) -> Parsed<Self> {
        Self::parse_with(payload, SchemaConfig::global())
    }

    pub fn parse_with(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let payload = Payload::new(payload)?;
        Ok(Self {
            ids: payload.capped_string_list(FieldNames::IDS, config)?,
            where_meta: payload.object(FieldNames::WHERE)?.map(WhereClause),
            where_document: payload
                .object(FieldNames::WHERE_DOCUMENT)?
                .map(WhereDocument),
            sort: payload.string(FieldNames::SORT)?,
            limit: payload.count(FieldNames::LIMIT, 1)?,
            offset: payload.count(FieldNames::OFFSET, 0)?,
            include: payload
                .include(FieldNames::INCLUDE)?
                .unwrap_or_else(Include::default_get),
        })
    }
}

impl QueryRequest {
    /// Parse against the process-wide [`SchemaConfig`].
    pub fn parse(payload: &Value) -> Parsed<Self> {
        Self::parse_with(payload, SchemaConfig::global())
    }

    pub fn parse_with(payload: &Value, config: &SchemaConfig) -> Parsed<Self> {
        let payload = Payload::new(payload)?;

        let raw = payload.required(FieldNames::QUERY_EMBEDDINGS)?;
        let items = raw.as_array().ok_or_else(|| {
            ValidationError::wrong_type(FieldNames::QUERY_EMBEDDINGS, "array", json_kind(raw))
        })?;
        if items.is_empty() {
            return Err(ValidationError::new(
                FieldNames::QUERY_EMBEDDINGS,
                ValidationReason::Empty,
            ));
        }
        check_batch(config, FieldNames::QUERY_EMBEDDINGS, items.len())?;
        let query_embeddings = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                parse_embedding(&format!("{}[{i}]", FieldNames::QUERY_EMBEDDINGS), item)
            })
            .collect::<Parsed<Vec<_>>>()?;

        Ok(Self {
            query_embeddings,
            n_results: payload
                .count(FieldNames::N_RESULTS, 1)?
                .unwrap_or(config.default_n_results),
            where_meta: payload.object(FieldNames::WHERE)?.map(WhereClause),
            where_document: payload
                .object(FieldNames::WHERE_DOCUMENT)?
                .map(WhereDocument),
            include: payload
                .include(FieldNames::INCLUDE)?
                .unwrap_or_else(Include::default_query),
        })
    }
}

impl CollectionCreateRequest {
    pub fn parse(payload: &Value) -> Parsed<Self> {
        let payload = Payload::new(payload)?;
        let name = payload
            .string(FieldNames::NAME)?
            .ok_or_else(|| ValidationError::missing(FieldNames::NAME))?;
        CollectionNames::validate(FieldNames::NAME, &name)?;

        Ok(Self {
            name,
            metadata: payload
                .get(FieldNames::METADATA)
                .map(|v| parse_metadata(FieldNames::METADATA, v))
                .transpose()?,
            get_or_create: payload.bool_or(FieldNames::GET_OR_CREATE, false)?,
        })
    }
}

impl CollectionUpdateRequest {
    pub fn parse(payload: &Value) -> Parsed<Self> {
        let payload = Payload::new(payload)?;
        let new_name = payload.string(FieldNames::NEW_NAME)?;
        if let Some(name) = &new_name {
            CollectionNames::validate(FieldNames::NEW_NAME, name)?;
        }

        Ok(Self {
            new_name,
            new_metadata: payload
                .get(FieldNames::NEW_METADATA)
                .map(|v| parse_metadata(FieldNames::NEW_METADATA, v))
                .transpose()?,
        })
    }

    /// True when neither a new name nor new metadata was supplied.
    pub fn is_noop(&self) -> bool {
        self.new_name.is_none() && self.new_metadata.is_none()
    }
}

/// Field accessors over a JSON object body. `null` reads as absent.
struct Payload<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> Payload<'a> {
    fn new(value: &'a Value) -> Parsed<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(ValidationError::wrong_type(
                FieldNames::BODY,
                "object",
                json_kind(other),
            )),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields.get(key).filter(|v| !v.is_null())
    }

    fn required(&self, key: &str) -> Parsed<&'a Value> {
        self.get(key).ok_or_else(|| ValidationError::missing(key))
    }

    fn string(&self, key: &str) -> Parsed<Option<String>> {
        self.get(key)
            .map(|v| parse_string(key, v))
            .transpose()
    }

    fn bool_or(&self, key: &str, default: bool) -> Parsed<bool> {
        match self.get(key) {
            None => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(other) => Err(ValidationError::wrong_type(key, "bool", json_kind(other))),
        }
    }

    /// Non-negative integer no smaller than `min`.
    fn count(&self, key: &str, min: u32) -> Parsed<Option<u32>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let Value::Number(n) = value else {
            return Err(ValidationError::wrong_type(key, "integer", json_kind(value)));
        };
        let Some(i) = n.as_i64() else {
            if n.is_u64() {
                return Err(too_large(key));
            }
            return Err(ValidationError::wrong_type(key, "integer", "float"));
        };
        if i < i64::from(min) {
            return Err(ValidationError::new(
                key,
                ValidationReason::OutOfRange {
                    min: i64::from(min),
                    actual: i,
                },
            ));
        }
        u32::try_from(i).map(Some).map_err(|_| too_large(key))
    }

    fn object(&self, key: &str) -> Parsed<Option<Map<String, Value>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(other) => Err(ValidationError::wrong_type(key, "object", json_kind(other))),
        }
    }

    fn string_list(&self, key: &str) -> Parsed<Option<Vec<String>>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ValidationError::wrong_type(key, "array", json_kind(value)))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_string(&format!("{key}[{i}]"), item))
            .collect::<Parsed<Vec<_>>>()
            .map(Some)
    }

    /// Optional id list subject to the configured batch cap.
    fn capped_string_list(&self, key: &str, config: &SchemaConfig) -> Parsed<Option<Vec<String>>> {
        let list = self.string_list(key)?;
        if let Some(items) = &list {
            check_batch(config, key, items.len())?;
        }
        Ok(list)
    }

    /// Array whose entries may individually be `null`.
    fn nullable_list<T>(
        &self,
        key: &str,
        parse: fn(&str, &Value) -> Parsed<T>,
    ) -> Parsed<Parallel<T>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ValidationError::wrong_type(key, "array", json_kind(value)))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Null => Ok(None),
                _ => parse(&format!("{key}[{i}]"), item).map(Some),
            })
            .collect::<Parsed<Vec<_>>>()
            .map(Some)
    }

    fn include(&self, key: &str) -> Parsed<Option<Include>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ValidationError::wrong_type(key, "array", json_kind(value)))?;
        let mut include = Include::none();
        for (i, item) in items.iter().enumerate() {
            let path = format!("{key}[{i}]");
            let name = parse_string(&path, item)?;
            let field = name
                .parse::<IncludeField>()
                .map_err(|e| ValidationError::new(path, e.reason))?;
            include.insert(field);
        }
        Ok(Some(include))
    }
}

fn parse_string(field: &str, value: &Value) -> Parsed<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ValidationError::wrong_type(field, "string", json_kind(value)))
}

fn parse_document(field: &str, value: &Value) -> Parsed<Document> {
    parse_string(field, value)
}

fn parse_embedding(field: &str, value: &Value) -> Parsed<Embedding> {
    let items = value
        .as_array()
        .ok_or_else(|| ValidationError::wrong_type(field, "array", json_kind(value)))?;
    if items.is_empty() {
        return Err(ValidationError::new(field, ValidationReason::Empty));
    }
    items
        .iter()
        .enumerate()
        .map(|(j, item)| {
            EmbeddingValue::from_json(item).ok_or_else(|| {
                ValidationError::wrong_type(format!("{field}[{j}]"), "number", json_kind(item))
            })
        })
        .collect()
}

fn parse_metadata(field: &str, value: &Value) -> Parsed<Metadata> {
    let Value::Object(map) = value else {
        return Err(ValidationError::wrong_type(field, "object", json_kind(value)));
    };
    map.iter()
        .map(|(key, v)| {
            MetadataValue::from_json(v)
                .map(|scalar| (key.clone(), scalar))
                .ok_or_else(|| {
                    ValidationError::wrong_type(format!("{field}.{key}"), "scalar", json_kind(v))
                })
        })
        .collect()
}

fn check_parallel<T>(field: &str, expected: usize, items: Option<&[T]>) -> Parsed<()> {
    match items {
        Some(items) if items.len() != expected => Err(ValidationError::new(
            field,
            ValidationReason::LengthMismatch {
                expected,
                actual: items.len(),
            },
        )),
        _ => Ok(()),
    }
}

fn check_batch(config: &SchemaConfig, field: &str, actual: usize) -> Parsed<()> {
    match config.max_batch_size {
        Some(max) if actual > max => Err(ValidationError::new(
            field,
            ValidationReason::BatchTooLarge { max, actual },
        )),
        _ => Ok(()),
    }
}

fn assemble(
    ids: &[String],
    embeddings: Option<&[Option<Embedding>]>,
    metadatas: Option<&[Option<Metadata>]>,
    documents: Option<&[Option<Document>]>,
) -> Vec<EmbeddingRecord> {
    fn at<T: Clone>(items: Option<&[Option<T>]>, i: usize) -> Option<T> {
        items.and_then(|items| items.get(i)).cloned().flatten()
    }

    ids.iter()
        .enumerate()
        .map(|(i, id)| EmbeddingRecord {
            id: id.clone(),
            embedding: at(embeddings, i),
            metadata: at(metadatas, i),
            document: at(documents, i),
        })
        .collect()
}

fn too_large(field: &str) -> ValidationError {
    ValidationError::new(
        field,
        ValidationReason::Invalid(format!("must be at most {}", u32::MAX)),
    )
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
