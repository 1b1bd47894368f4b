//! Request/response contract for a vector-collection data service.
//!
//! Raw JSON payloads are parsed into validated requests ([`requests`]), passed to
//! a [`StorageEngine`], and the engine's rows are shaped by the caller's
//! `include` selection ([`response`]).

pub mod backend;
pub mod config;
pub mod error;
pub mod filters;
pub mod memory;
pub mod meta;
pub mod requests;
pub mod response;
pub mod service;
#[cfg(feature = "sync")]
pub mod sync;
pub mod types;

pub use crate::backend::{QueryMatch, RecordRow, StorageEngine};
pub use crate::config::{DistanceMetric, SchemaConfig};
pub use crate::error::{ApiError, Result, ValidationError, ValidationReason};
pub use crate::filters::{DocFilter, Filter, Selection, WhereClause, WhereDocument};
pub use crate::memory::InMemoryEngine;
pub use crate::meta::{CollectionNames, FieldNames};
pub use crate::requests::{
    AddRequest, CollectionCreateRequest, CollectionUpdateRequest, DeleteRequest, GetRequest,
    QueryRequest, UpdateRequest,
};
pub use crate::service::CollectionService;
#[cfg(feature = "sync")]
pub use crate::sync::SyncCollectionService;
pub use crate::types::{
    Collection, Document, Embedding, EmbeddingRecord, EmbeddingValue, GetResult, Include,
    IncludeField, Metadata, MetadataValue, QueryResult,
};
