use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::types::{Metadata, MetadataValue};

/// A `where` mapping as received on the wire.
///
/// The schema layer only checks that it is a JSON object; operator grammar is
/// compiled by the storage engine via [`Filter::compile`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhereClause(pub Map<String, Value>);

/// A `where_document` mapping as received on the wire. See [`DocFilter::compile`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhereDocument(pub Map<String, Value>);

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl WhereDocument {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Metadata filter expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    Eq {
        field: String,
        value: MetadataValue,
    },
    Ne {
        field: String,
        value: MetadataValue,
    },
    Lt {
        field: String,
        value: MetadataValue,
    },
    Gt {
        field: String,
        value: MetadataValue,
    },
    Lte {
        field: String,
        value: MetadataValue,
    },
    Gte {
        field: String,
        value: MetadataValue,
    },
    In {
        field: String,
        values: Vec<MetadataValue>,
    },
    Nin {
        field: String,
        values: Vec<MetadataValue>,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

/// Document filter expressions.
#[derive(Clone, Debug, PartialEq)]
pub enum DocFilter {
    Contains(String),
    NotContains(String),
    And(Vec<DocFilter>),
    Or(Vec<DocFilter>),
}

impl Filter {
    /// Compile a `where` mapping. Several keys in one mapping are an implicit `$and`;
    /// `{}` compiles to an empty `And`, which matches every record.
    pub fn compile(clause: &WhereClause) -> Result<Filter> {
        compile_where(&clause.0)
    }

    pub fn matches(&self, metadata: Option<&Metadata>) -> bool {
        let lookup = |field: &str| metadata.and_then(|m| m.get(field));
        match self {
            Filter::Eq { field, value } => lookup(field).is_some_and(|v| v.loosely_eq(value)),
            Filter::Ne { field, value } => !lookup(field).is_some_and(|v| v.loosely_eq(value)),
            Filter::Lt { field, value } => compare(lookup(field), value, |a, b| a < b),
            Filter::Gt { field, value } => compare(lookup(field), value, |a, b| a > b),
            Filter::Lte { field, value } => compare(lookup(field), value, |a, b| a <= b),
            Filter::Gte { field, value } => compare(lookup(field), value, |a, b| a >= b),
            Filter::In { field, values } => {
                lookup(field).is_some_and(|v| values.iter().any(|x| v.loosely_eq(x)))
            }
            Filter::Nin { field, values } => {
                !lookup(field).is_some_and(|v| values.iter().any(|x| v.loosely_eq(x)))
            }
            Filter::And(filters) => filters.iter().all(|f| f.matches(metadata)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(metadata)),
        }
    }
}

impl DocFilter {
    /// Compile a `where_document` mapping; `{}` matches every record.
    pub fn compile(clause: &WhereDocument) -> Result<DocFilter> {
        compile_doc(&clause.0)
    }

    pub fn matches(&self, document: Option<&str>) -> bool {
        match self {
            DocFilter::Contains(text) => document.is_some_and(|d| d.contains(text.as_str())),
            DocFilter::NotContains(text) => !document.is_some_and(|d| d.contains(text.as_str())),
            DocFilter::And(filters) => filters.iter().all(|f| f.matches(document)),
            DocFilter::Or(filters) => filters.iter().any(|f| f.matches(document)),
        }
    }
}

/// Combined record predicate: ids AND metadata filter AND document filter.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    ids: Option<HashSet<String>>,
    filter: Option<Filter>,
    doc_filter: Option<DocFilter>,
}

impl Selection {
    pub fn compile(
        ids: Option<&[String]>,
        where_meta: Option<&WhereClause>,
        where_doc: Option<&WhereDocument>,
    ) -> Result<Self> {
        Ok(Self {
            ids: ids.map(|ids| ids.iter().cloned().collect()),
            filter: where_meta.map(Filter::compile).transpose()?,
            doc_filter: where_doc.map(DocFilter::compile).transpose()?,
        })
    }

    pub fn matches(&self, id: &str, metadata: Option<&Metadata>, document: Option<&str>) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(id) {
                return false;
            }
        }
        if let Some(filter) = &self.filter {
            if !filter.matches(metadata) {
                return false;
            }
        }
        if let Some(doc_filter) = &self.doc_filter {
            if !doc_filter.matches(document) {
                return false;
            }
        }
        true
    }
}

fn compile_where(map: &Map<String, Value>) -> Result<Filter> {
    let mut parts = Vec::new();
    for (key, value) in map {
        match key.as_str() {
            "$and" => parts.push(Filter::And(compile_where_list(key, value)?)),
            "$or" => parts.push(Filter::Or(compile_where_list(key, value)?)),
            op if op.starts_with('$') => {
                return Err(ApiError::FilterSyntax(format!(
                    "unknown logical operator `{op}` in where"
                )));
            }
            field => parts.push(compile_field(field, value)?),
        }
    }
    Ok(collapse(parts, Filter::And))
}

fn compile_where_list(op: &str, value: &Value) -> Result<Vec<Filter>> {
    let items = value
        .as_array()
        .ok_or_else(|| ApiError::FilterSyntax(format!("`{op}` expects a list of where clauses")))?;
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => compile_where(map),
            _ => Err(ApiError::FilterSyntax(format!(
                "`{op}` expects a list of where clauses"
            ))),
        })
        .collect()
}

fn compile_field(field: &str, value: &Value) -> Result<Filter> {
    let Value::Object(ops) = value else {
        return Ok(Filter::Eq {
            field: field.to_string(),
            value: operand(field, "$eq", value)?,
        });
    };

    if ops.len() != 1 {
        return Err(ApiError::FilterSyntax(format!(
            "field `{field}` expects exactly one operator, got {}",
            ops.len()
        )));
    }

    let mut parts = Vec::with_capacity(1);
    for (op, arg) in ops {
        let field = field.to_string();
        let filter = match op.as_str() {
            "$eq" => Filter::Eq {
                value: operand(&field, op, arg)?,
                field,
            },
            "$ne" => Filter::Ne {
                value: operand(&field, op, arg)?,
                field,
            },
            "$gt" => Filter::Gt {
                value: numeric_operand(&field, op, arg)?,
                field,
            },
            "$gte" => Filter::Gte {
                value: numeric_operand(&field, op, arg)?,
                field,
            },
            "$lt" => Filter::Lt {
                value: numeric_operand(&field, op, arg)?,
                field,
            },
            "$lte" => Filter::Lte {
                value: numeric_operand(&field, op, arg)?,
                field,
            },
            "$in" => Filter::In {
                values: operand_list(&field, op, arg)?,
                field,
            },
            "$nin" => Filter::Nin {
                values: operand_list(&field, op, arg)?,
                field,
            },
            other => {
                return Err(ApiError::FilterSyntax(format!(
                    "unknown operator `{other}` on field `{field}`"
                )));
            }
        };
        parts.push(filter);
    }
    Ok(collapse(parts, Filter::And))
}

fn operand(field: &str, op: &str, value: &Value) -> Result<MetadataValue> {
    match MetadataValue::from_json(value) {
        Some(MetadataValue::Null) | None => Err(ApiError::FilterSyntax(format!(
            "`{op}` on field `{field}` expects a string, number or bool"
        ))),
        Some(v) => Ok(v),
    }
}

fn numeric_operand(field: &str, op: &str, value: &Value) -> Result<MetadataValue> {
    let v = operand(field, op, value)?;
    if v.as_f64().is_none() {
        return Err(ApiError::FilterSyntax(format!(
            "`{op}` on field `{field}` expects a number, got {}",
            v.kind()
        )));
    }
    Ok(v)
}

fn operand_list(field: &str, op: &str, value: &Value) -> Result<Vec<MetadataValue>> {
    let items = value.as_array().ok_or_else(|| {
        ApiError::FilterSyntax(format!("`{op}` on field `{field}` expects a list"))
    })?;
    items.iter().map(|item| operand(field, op, item)).collect()
}

fn compile_doc(map: &Map<String, Value>) -> Result<DocFilter> {
    let mut parts = Vec::new();
    for (key, value) in map {
        let filter = match key.as_str() {
            "$contains" => DocFilter::Contains(doc_text(key, value)?),
            "$not_contains" => DocFilter::NotContains(doc_text(key, value)?),
            "$and" => DocFilter::And(compile_doc_list(key, value)?),
            "$or" => DocFilter::Or(compile_doc_list(key, value)?),
            other => {
                return Err(ApiError::FilterSyntax(format!(
                    "unknown operator `{other}` in where_document"
                )));
            }
        };
        parts.push(filter);
    }
    Ok(collapse(parts, DocFilter::And))
}

fn compile_doc_list(op: &str, value: &Value) -> Result<Vec<DocFilter>> {
    let items = value.as_array().ok_or_else(|| {
        ApiError::FilterSyntax(format!("`{op}` expects a list of where_document clauses"))
    })?;
    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => compile_doc(map),
            _ => Err(ApiError::FilterSyntax(format!(
                "`{op}` expects a list of where_document clauses"
            ))),
        })
        .collect()
}

fn doc_text(op: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ApiError::FilterSyntax(format!("`{op}` expects a string")))
}

fn compare(actual: Option<&MetadataValue>, expected: &MetadataValue, op: fn(f64, f64) -> bool) -> bool {
    match (actual.and_then(MetadataValue::as_f64), expected.as_f64()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    }
}

fn collapse<F>(mut parts: Vec<F>, and: fn(Vec<F>) -> F) -> F {
    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return only;
        }
    }
    and(parts)
}
