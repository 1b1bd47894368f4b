//! In-memory [`StorageEngine`] used for tests and local experiments.
//!
//! Collections live in a `BTreeMap` keyed by name so listing is ordered;
//! records keep insertion order. Similarity search is a brute-force scan.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::{QueryMatch, RecordRow, StorageEngine};
use crate::config::DistanceMetric;
use crate::error::{ApiError, Result};
use crate::filters::Selection;
use crate::requests::{
    AddRequest, CollectionCreateRequest, CollectionUpdateRequest, DeleteRequest, GetRequest,
    QueryRequest, UpdateRequest,
};
use crate::types::{Collection, Embedding, EmbeddingRecord, Metadata, MetadataValue};

struct CollectionState {
    info: Collection,
    metric: DistanceMetric,
    /// Fixed by the first stored embedding.
    dimension: Option<usize>,
    records: Vec<RecordRow>,
}

impl CollectionState {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn check_dimensions<'a, I>(&self, embeddings: I) -> Result<Option<usize>>
    where
        I: IntoIterator<Item = &'a Embedding>,
    {
        let mut dimension = self.dimension;
        for emb in embeddings {
            match dimension {
                Some(d) if d != emb.len() => {
                    return Err(ApiError::Storage(format!(
                        "embedding dimension {} does not match collection dimension {d}",
                        emb.len()
                    )));
                }
                Some(_) => {}
                None => dimension = Some(emb.len()),
            }
        }
        Ok(dimension)
    }
}

/// Reference storage engine holding everything in process memory.
#[derive(Default)]
pub struct InMemoryEngine {
    collections: RwLock<BTreeMap<String, CollectionState>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<R>(&self, name: &str, f: impl FnOnce(&CollectionState) -> Result<R>) -> Result<R> {
        let collections = self.collections.read();
        let state = collections
            .get(name)
            .ok_or_else(|| collection_not_found(name))?;
        f(state)
    }

    fn write<R>(
        &self,
        name: &str,
        f: impl FnOnce(&mut CollectionState) -> Result<R>,
    ) -> Result<R> {
        let mut collections = self.collections.write();
        let state = collections
            .get_mut(name)
            .ok_or_else(|| collection_not_found(name))?;
        f(state)
    }
}

#[async_trait]
impl StorageEngine for InMemoryEngine {
    async fn create_collection(&self, request: &CollectionCreateRequest) -> Result<Collection> {
        let mut collections = self.collections.write();
        if let Some(existing) = collections.get(&request.name) {
            if request.get_or_create {
                debug!(collection = %request.name, "returning existing collection");
                return Ok(existing.info.clone());
            }
            return Err(ApiError::Conflict(format!(
                "collection `{}` already exists",
                request.name
            )));
        }

        let metric = metric_from_metadata(request.metadata.as_ref())?;
        let info = Collection {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name.clone(),
            metadata: request.metadata.clone(),
        };
        collections.insert(
            request.name.clone(),
            CollectionState {
                info: info.clone(),
                metric,
                dimension: None,
                records: Vec::new(),
            },
        );
        debug!(collection = %request.name, metric = metric.as_str(), "created collection");
        Ok(info)
    }

    async fn get_collection(&self, name: &str) -> Result<Collection> {
        self.read(name, |state| Ok(state.info.clone()))
    }

    async fn update_collection(
        &self,
        name: &str,
        request: &CollectionUpdateRequest,
    ) -> Result<()> {
        let mut collections = self.collections.write();
        let current = collections
            .get(name)
            .map(|state| state.metric)
            .ok_or_else(|| collection_not_found(name))?;
        if let Some(new_name) = &request.new_name {
            if new_name != name && collections.contains_key(new_name) {
                return Err(ApiError::Conflict(format!(
                    "collection `{new_name}` already exists"
                )));
            }
        }
        let metadata = match &request.new_metadata {
            Some(metadata) => Some(keep_metric(name, current, metadata)?),
            None => None,
        };

        let Some(mut state) = collections.remove(name) else {
            return Err(collection_not_found(name));
        };
        if let Some(metadata) = metadata {
            state.info.metadata = Some(metadata);
        }
        if let Some(new_name) = &request.new_name {
            state.info.name = new_name.clone();
        }
        collections.insert(state.info.name.clone(), state);
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| collection_not_found(name))
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        Ok(self
            .collections
            .read()
            .values()
            .map(|state| state.info.clone())
            .collect())
    }

    async fn count(&self, collection: &str) -> Result<usize> {
        self.read(collection, |state| Ok(state.records.len()))
    }

    async fn add(&self, collection: &str, request: &AddRequest) -> Result<()> {
        let records = request.records();
        self.write(collection, |state| {
            let mut seen: HashSet<&str> = state.records.iter().map(|r| r.id.as_str()).collect();
            for record in &records {
                if !seen.insert(record.id.as_str()) {
                    return Err(ApiError::Conflict(format!(
                        "record `{}` already exists in collection `{collection}`",
                        record.id
                    )));
                }
            }
            let dimension =
                state.check_dimensions(records.iter().filter_map(|r| r.embedding.as_ref()))?;

            state.dimension = dimension;
            state.records.extend(records.into_iter().map(
                |EmbeddingRecord {
                     id,
                     embedding,
                     metadata,
                     document,
                 }| RecordRow {
                    id,
                    embedding,
                    metadata,
                    document,
                },
            ));
            debug!(collection, count = state.records.len(), "added records");
            Ok(())
        })
    }

    async fn update(&self, collection: &str, request: &UpdateRequest) -> Result<()> {
        let records = request.records();
        self.write(collection, |state| {
            let mut positions = Vec::with_capacity(records.len());
            for record in &records {
                let pos = state.position(&record.id).ok_or_else(|| {
                    ApiError::NotFound(format!(
                        "record `{}` in collection `{collection}`",
                        record.id
                    ))
                })?;
                positions.push(pos);
            }
            let dimension =
                state.check_dimensions(records.iter().filter_map(|r| r.embedding.as_ref()))?;

            state.dimension = dimension;
            for (pos, record) in positions.into_iter().zip(records) {
                let row = &mut state.records[pos];
                if let Some(embedding) = record.embedding {
                    row.embedding = Some(embedding);
                }
                if let Some(document) = record.document {
                    row.document = Some(document);
                }
                if let Some(metadata) = record.metadata {
                    row.metadata
                        .get_or_insert_with(Metadata::new)
                        .extend(metadata);
                }
            }
            Ok(())
        })
    }

    async fn delete(&self, collection: &str, request: &DeleteRequest) -> Result<()> {
        let selection = Selection::compile(
            request.ids.as_deref(),
            request.where_meta.as_ref(),
            request.where_document.as_ref(),
        )?;
        self.write(collection, |state| {
            let before = state.records.len();
            state.records.retain(|r| {
                !selection.matches(&r.id, r.metadata.as_ref(), r.document.as_deref())
            });
            if state.records.iter().all(|r| r.embedding.is_none()) {
                state.dimension = None;
            }
            debug!(
                collection,
                deleted = before - state.records.len(),
                "deleted records"
            );
            Ok(())
        })
    }

    async fn get(&self, collection: &str, request: &GetRequest) -> Result<Vec<RecordRow>> {
        let selection = Selection::compile(
            request.ids.as_deref(),
            request.where_meta.as_ref(),
            request.where_document.as_ref(),
        )?;
        self.read(collection, |state| {
            let mut rows: Vec<&RecordRow> = state
                .records
                .iter()
                .filter(|r| selection.matches(&r.id, r.metadata.as_ref(), r.document.as_deref()))
                .collect();

            if let Some(key) = &request.sort {
                rows.sort_by(|a, b| {
                    compare_sort_values(
                        a.metadata.as_ref().and_then(|m| m.get(key)),
                        b.metadata.as_ref().and_then(|m| m.get(key)),
                    )
                });
            }

            let offset = request.offset.unwrap_or(0) as usize;
            let limit = request.limit.map_or(usize::MAX, |l| l as usize);
            Ok(rows.into_iter().skip(offset).take(limit).cloned().collect())
        })
    }

    async fn query(
        &self,
        collection: &str,
        request: &QueryRequest,
    ) -> Result<Vec<Vec<QueryMatch>>> {
        let selection = Selection::compile(
            None,
            request.where_meta.as_ref(),
            request.where_document.as_ref(),
        )?;
        self.read(collection, |state| {
            state.check_dimensions(request.query_embeddings.iter())?;

            let candidates: Vec<(&RecordRow, Vec<f64>)> = state
                .records
                .iter()
                .filter(|r| selection.matches(&r.id, r.metadata.as_ref(), r.document.as_deref()))
                .filter_map(|r| r.embedding.as_ref().map(|e| (r, to_f64(e))))
                .collect();

            let n_results = request.n_results as usize;
            let mut results = Vec::with_capacity(request.query_embeddings.len());
            for query in &request.query_embeddings {
                let query = to_f64(query);
                let mut hits: Vec<QueryMatch> = candidates
                    .iter()
                    .map(|(row, emb)| QueryMatch {
                        row: (*row).clone(),
                        distance: state.metric.distance(&query, emb),
                    })
                    .collect();
                hits.sort_by(|a, b| {
                    a.distance
                        .partial_cmp(&b.distance)
                        .unwrap_or(Ordering::Equal)
                });
                hits.truncate(n_results);
                results.push(hits);
            }
            Ok(results)
        })
    }

    fn mode(&self) -> &'static str {
        "memory"
    }
}

fn collection_not_found(name: &str) -> ApiError {
    ApiError::NotFound(format!("collection `{name}`"))
}

fn metric_from_metadata(metadata: Option<&Metadata>) -> Result<DistanceMetric> {
    match metadata.and_then(|m| m.get(DistanceMetric::METADATA_KEY)) {
        None => Ok(DistanceMetric::L2),
        Some(MetadataValue::Str(name)) => DistanceMetric::parse(name).ok_or_else(|| {
            ApiError::Storage(format!("unsupported distance metric `{name}`"))
        }),
        Some(other) => Err(ApiError::Storage(format!(
            "`{}` must be a string, got {}",
            DistanceMetric::METADATA_KEY,
            other.kind()
        ))),
    }
}

/// New collection metadata with the distance metric pinned to `current`.
///
/// Omitting `hnsw:space` keeps the existing metric; naming another one is an error.
fn keep_metric(name: &str, current: DistanceMetric, metadata: &Metadata) -> Result<Metadata> {
    let mut metadata = metadata.clone();
    if metadata.contains_key(DistanceMetric::METADATA_KEY) {
        let requested = metric_from_metadata(Some(&metadata))?;
        if requested != current {
            return Err(ApiError::Storage(format!(
                "distance metric of collection `{name}` is `{}` and cannot be changed to `{}`",
                current.as_str(),
                requested.as_str()
            )));
        }
    } else if current != DistanceMetric::L2 {
        metadata.insert(
            DistanceMetric::METADATA_KEY.to_string(),
            MetadataValue::from(current.as_str()),
        );
    }
    Ok(metadata)
}

fn to_f64(embedding: &Embedding) -> Vec<f64> {
    embedding.iter().map(|v| v.as_f64()).collect()
}

/// Ascending order; missing values sort last, numbers before strings before bools.
fn compare_sort_values(a: Option<&MetadataValue>, b: Option<&MetadataValue>) -> Ordering {
    fn rank(v: &MetadataValue) -> u8 {
        match v {
            MetadataValue::Int(_) | MetadataValue::Float(_) => 0,
            MetadataValue::Str(_) => 1,
            MetadataValue::Bool(_) => 2,
            MetadataValue::Null => 3,
        }
    }

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a, b) {
            (MetadataValue::Str(x), MetadataValue::Str(y)) => x.cmp(y),
            (MetadataValue::Bool(x), MetadataValue::Bool(y)) => x.cmp(y),
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => rank(a).cmp(&rank(b)),
            },
        },
    }
}
