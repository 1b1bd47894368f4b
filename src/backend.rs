use crate::error::Result;
use crate::requests::{
    AddRequest, CollectionCreateRequest, CollectionUpdateRequest, DeleteRequest, GetRequest,
    QueryRequest, UpdateRequest,
};
use crate::types::{Collection, Document, Embedding, Metadata};

/// One stored record as handed back by a storage engine.
///
/// Engines may fill every field regardless of the requested `include`;
/// the response shaper drops what was not asked for.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordRow {
    pub id: String,
    pub embedding: Option<Embedding>,
    pub metadata: Option<Metadata>,
    pub document: Option<Document>,
}

/// A query hit: the record and its distance to the query embedding.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryMatch {
    pub row: RecordRow,
    pub distance: f64,
}

/// Asynchronous storage/indexing engine abstraction.
///
/// Requests reaching these methods have already passed schema validation.
/// Implementations report their own failures through
/// [`ApiError::Conflict`](crate::ApiError::Conflict),
/// [`ApiError::NotFound`](crate::ApiError::NotFound) and
/// [`ApiError::FilterSyntax`](crate::ApiError::FilterSyntax); callers pass them
/// through unchanged.
#[async_trait::async_trait]
pub trait StorageEngine: Send + Sync {
    async fn create_collection(&self, request: &CollectionCreateRequest) -> Result<Collection>;

    async fn get_collection(&self, name: &str) -> Result<Collection>;

    async fn update_collection(&self, name: &str, request: &CollectionUpdateRequest)
        -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// All collections, ordered by name.
    async fn list_collections(&self) -> Result<Vec<Collection>>;

    async fn count(&self, collection: &str) -> Result<usize>;

    async fn add(&self, collection: &str, request: &AddRequest) -> Result<()>;

    async fn update(&self, collection: &str, request: &UpdateRequest) -> Result<()>;

    async fn delete(&self, collection: &str, request: &DeleteRequest) -> Result<()>;

    async fn get(&self, collection: &str, request: &GetRequest) -> Result<Vec<RecordRow>>;

    /// One list per query embedding, nearest first, at most `n_results` long.
    async fn query(&self, collection: &str, request: &QueryRequest)
        -> Result<Vec<Vec<QueryMatch>>>;

    /// Short engine name for logging.
    fn mode(&self) -> &'static str;
}
