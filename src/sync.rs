use std::sync::Arc;

use serde_json::Value;

use crate::backend::StorageEngine;
use crate::config::SchemaConfig;
use crate::error::{ApiError, Result};
use crate::service::CollectionService;
use crate::types::{Collection, GetResult, QueryResult};

/// Shared inner state for the synchronous wrapper.
///
/// Holds a Tokio runtime and the underlying async `CollectionService`.
struct Inner<E: StorageEngine> {
    rt: tokio::runtime::Runtime,
    service: CollectionService<E>,
}

/// Blocking wrapper around [`CollectionService`].
///
/// Only available with the `sync` feature. Every call runs on an internal Tokio
/// runtime using `block_on`; do not call it from inside another Tokio runtime,
/// use the async service there instead.
pub struct SyncCollectionService<E: StorageEngine> {
    inner: Arc<Inner<E>>,
}

impl<E: StorageEngine> Clone for SyncCollectionService<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: StorageEngine> SyncCollectionService<E> {
    pub fn new(engine: E) -> Result<Self> {
        Self::with_config(engine, SchemaConfig::global().clone())
    }

    pub fn with_config(engine: E, config: SchemaConfig) -> Result<Self> {
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::Other(anyhow::Error::new(e)))?;
        let service = CollectionService::with_config(engine, config);
        Ok(Self {
            inner: Arc::new(Inner { rt, service }),
        })
    }

    pub fn create_collection(&self, payload: &Value) -> Result<Collection> {
        self.inner
            .rt
            .block_on(self.inner.service.create_collection(payload))
    }

    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        self.inner.rt.block_on(self.inner.service.get_collection(name))
    }

    pub fn update_collection(&self, name: &str, payload: &Value) -> Result<()> {
        self.inner
            .rt
            .block_on(self.inner.service.update_collection(name, payload))
    }

    pub fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner
            .rt
            .block_on(self.inner.service.delete_collection(name))
    }

    pub fn list_collections(&self) -> Result<Vec<Collection>> {
        self.inner.rt.block_on(self.inner.service.list_collections())
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        self.inner.rt.block_on(self.inner.service.count(collection))
    }

    pub fn add(&self, collection: &str, payload: &Value) -> Result<()> {
        self.inner
            .rt
            .block_on(self.inner.service.add(collection, payload))
    }

    pub fn update(&self, collection: &str, payload: &Value) -> Result<()> {
        self.inner
            .rt
            .block_on(self.inner.service.update(collection, payload))
    }

    pub fn delete(&self, collection: &str, payload: &Value) -> Result<()> {
        self.inner
            .rt
            .block_on(self.inner.service.delete(collection, payload))
    }

    pub fn get(&self, collection: &str, payload: &Value) -> Result<GetResult> {
        self.inner
            .rt
            .block_on(self.inner.service.get(collection, payload))
    }

    pub fn query(&self, collection: &str, payload: &Value) -> Result<QueryResult> {
        self.inner
            .rt
            .block_on(self.inner.service.query(collection, payload))
    }
}
