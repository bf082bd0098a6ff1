use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Document, DocumentStore, Filter, InsertOutcome, StorageError, WriteOp};

/// In-memory document store. Engine tests run against it, and it doubles as
/// the reference implementation for the fetch-all fallback path: built
/// without range support it refuses compound range queries outright, so a
/// caller that ignored the capability flag fails loudly instead of
/// silently working.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    next_id: AtomicU64,
    range_filters: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            range_filters: true,
        }
    }

    pub fn without_range_filters() -> Self {
        Self {
            range_filters: false,
            ..Self::new()
        }
    }

    fn allocate_id(&self) -> String {
        format!("doc-{}", self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn make_document(&self, data: Value) -> Document {
        Document {
            id: self.allocate_id(),
            data,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn supports_range_filters(&self) -> bool {
        self.range_filters
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError> {
        if !self.range_filters && filter.has_range() {
            return Err(StorageError::Unavailable(
                "compound range filters require a composite index".to_string(),
            ));
        }
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(&doc.data))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id).cloned()))
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StorageError> {
        let doc = self.make_document(data);
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());
        Ok(doc)
    }

    async fn insert_if_vacant(
        &self,
        collection: &str,
        guard: &Filter,
        data: Value,
    ) -> Result<InsertOutcome, StorageError> {
        // Check and insert under one write lock: a true compare-and-swap on
        // the guard key, so concurrent bookings get exactly one winner.
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|doc| guard.matches(&doc.data)) {
            return Ok(InsertOutcome::Occupied);
        }
        let doc = self.make_document(data);
        docs.push(doc.clone());
        Ok(InsertOutcome::Created(doc))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StorageError> {
        let mut collections = self.collections.write().await;
        let docs = collections.get_mut(collection).ok_or(StorageError::NotFound)?;
        let doc = docs
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or(StorageError::NotFound)?;

        let patch_map = match patch {
            Value::Object(map) => map,
            other => {
                return Err(StorageError::InvalidRecord(format!(
                    "patch must be an object, got {}",
                    other
                )))
            }
        };
        if let Value::Object(ref mut data) = doc.data {
            for (key, value) in patch_map {
                data.insert(key, value);
            }
        }
        Ok(doc.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        let mut collections = self.collections.write().await;
        let docs = collections.get_mut(collection).ok_or(StorageError::NotFound)?;
        let before = docs.len();
        docs.retain(|doc| doc.id != id);
        if docs.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        // Single write lock for the whole batch makes it all-or-nothing
        // against concurrent readers; deletes of unknown ids abort the batch
        // before any mutation is applied.
        let mut collections = self.collections.write().await;

        for op in &ops {
            if let WriteOp::Delete { collection, id } = op {
                let exists = collections
                    .get(collection.as_str())
                    .map(|docs| docs.iter().any(|doc| doc.id == *id))
                    .unwrap_or(false);
                if !exists {
                    return Err(StorageError::NotFound);
                }
            }
        }

        for op in ops {
            match op {
                WriteOp::Insert { collection, data } => {
                    let doc = self.make_document(data);
                    collections.entry(collection).or_default().push(doc);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = collections.get_mut(&collection) {
                        docs.retain(|doc| doc.id != id);
                    }
                }
            }
        }
        Ok(())
    }
}
