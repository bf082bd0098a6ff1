pub mod filter;
pub mod memory;
pub mod rest;

pub use filter::{Condition, Filter, FilterOp};
pub use memory::MemoryStore;
pub use rest::RestDocumentStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("record not found")]
    NotFound,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("write conflict")]
    Conflict,
}

/// A stored document: opaque storage-assigned id plus the record body.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the record, injecting the document id under `id` so model
    /// structs can carry it as a plain field.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        let mut value = self.data.clone();
        if let Value::Object(ref mut map) = value {
            map.insert("id".to_string(), Value::String(self.id.clone()));
        }
        serde_json::from_value(value).map_err(|e| StorageError::InvalidRecord(e.to_string()))
    }
}

#[derive(Debug, Clone)]
pub enum WriteOp {
    Insert { collection: String, data: Value },
    Delete { collection: String, id: String },
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(Document),
    /// The guard filter matched an existing document; nothing was written.
    Occupied,
}

/// Boundary to the hosted document database. Every read is a fresh query;
/// no implementation caches across calls.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Capability check: true when the backend can serve a compound filter
    /// mixing equality and a range on another field in one query. Callers
    /// select their query strategy on this flag, never by catching errors.
    fn supports_range_filters(&self) -> bool;

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError>;

    async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError>;

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StorageError>;

    /// Insert `data` only if no document matches `guard`. This is the
    /// uniqueness primitive behind the one-winner booking guarantee: the
    /// in-memory store performs it atomically, the REST store relies on a
    /// backend unique index (a 409 maps to `Occupied`) and otherwise
    /// degrades to check-then-insert with a documented residual race.
    async fn insert_if_vacant(
        &self,
        collection: &str,
        guard: &Filter,
        data: Value,
    ) -> Result<InsertOutcome, StorageError>;

    /// Partial update: only the fields present in `patch` are overwritten.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StorageError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError>;

    /// Apply a batch of writes, all-or-nothing where the backend supports it.
    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StorageError>;
}
