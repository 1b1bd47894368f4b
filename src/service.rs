use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::StorageEngine;
use crate::config::SchemaConfig;
use crate::error::{Result, ValidationError};
use crate::requests::{
    AddRequest, CollectionCreateRequest, CollectionUpdateRequest, DeleteRequest, GetRequest,
    QueryRequest, UpdateRequest,
};
use crate::types::{Collection, GetResult, QueryResult};

/// Entry point for transport handlers.
///
/// Each call parses the raw payload, hands the typed request to the engine and
/// shapes the result. Payloads that fail validation never reach the engine;
/// engine errors are returned as-is.
pub struct CollectionService<E: StorageEngine> {
    engine: Arc<E>,
    config: SchemaConfig,
}

impl<E: StorageEngine> Clone for CollectionService<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            config: self.config.clone(),
        }
    }
}

impl<E: StorageEngine> CollectionService<E> {
    /// Build a service using the process-wide [`SchemaConfig`].
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, SchemaConfig::global().clone())
    }

    pub fn with_config(engine: E, config: SchemaConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    // Collections

    pub async fn create_collection(&self, payload: &Value) -> Result<Collection> {
        let request = checked("create_collection", CollectionCreateRequest::parse(payload))?;
        debug!(
            mode = self.engine.mode(),
            collection = %request.name,
            get_or_create = request.get_or_create,
            "create_collection"
        );
        self.engine.create_collection(&request).await
    }

    pub async fn get_collection(&self, name: &str) -> Result<Collection> {
        self.engine.get_collection(name).await
    }

    pub async fn update_collection(&self, name: &str, payload: &Value) -> Result<()> {
        let request = checked("update_collection", CollectionUpdateRequest::parse(payload))?;
        if request.is_noop() {
            debug!(collection = name, "update_collection with nothing to change");
        }
        self.engine.update_collection(name, &request).await
    }

    pub async fn delete_collection(&self, name: &str) -> Result<()> {
        debug!(collection = name, "delete_collection");
        self.engine.delete_collection(name).await
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>> {
        self.engine.list_collections().await
    }

    // DML

    pub async fn count(&self, collection: &str) -> Result<usize> {
        self.engine.count(collection).await
    }

    pub async fn add(&self, collection: &str, payload: &Value) -> Result<()> {
        let request = checked("add", AddRequest::parse_with(payload, &self.config))?;
        debug!(collection, records = request.len(), "add");
        self.engine.add(collection, &request).await
    }

    pub async fn update(&self, collection: &str, payload: &Value) -> Result<()> {
        let request = checked("update", UpdateRequest::parse_with(payload, &self.config))?;
        debug!(collection, records = request.len(), "update");
        self.engine.update(collection, &request).await
    }

    pub async fn delete(&self, collection: &str, payload: &Value) -> Result<()> {
        let request = checked("delete", DeleteRequest::parse_with(payload, &self.config))?;
        debug!(
            collection,
            ids = request.ids.as_ref().map_or(0, Vec::len),
            filtered = request.where_meta.is_some() || request.where_document.is_some(),
            "delete"
        );
        self.engine.delete(collection, &request).await
    }

    // DQL

    pub async fn get(&self, collection: &str, payload: &Value) -> Result<GetResult> {
        let request = checked("get", GetRequest::parse_with(payload, &self.config))?;
        debug!(collection, limit = ?request.limit, offset = ?request.offset, "get");
        let rows = self.engine.get(collection, &request).await?;
        Ok(GetResult::from_rows(rows, request.include))
    }

    pub async fn query(&self, collection: &str, payload: &Value) -> Result<QueryResult> {
        let request = checked("query", QueryRequest::parse_with(payload, &self.config))?;
        debug!(
            collection,
            queries = request.query_embeddings.len(),
            n_results = request.n_results,
            "query"
        );
        let matches = self.engine.query(collection, &request).await?;
        Ok(QueryResult::from_matches(matches, request.include))
    }
}

fn checked<T>(operation: &str, parsed: std::result::Result<T, ValidationError>) -> Result<T> {
    parsed.map_err(|err| {
        warn!(operation, field = %err.field, reason = %err.reason, "rejected payload");
        err.into()
    })
}
