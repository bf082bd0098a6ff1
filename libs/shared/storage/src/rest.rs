use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;

use crate::{Document, DocumentStore, Filter, InsertOutcome, StorageError, WriteOp};

/// PostgREST-style client for the hosted document database. One collection
/// maps to one resource path; filters become query parameters
/// (`?doctor=eq.secondi&date=gte.2025-03-10`).
pub struct RestDocumentStore {
    client: Client,
    base_url: String,
    api_key: String,
    range_filters: bool,
}

impl RestDocumentStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            api_key: config.store_api_key.clone(),
            range_filters: config.store_range_filters,
        }
    }

    fn headers(&self, returning: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(value) = HeaderValue::from_str(&self.api_key) {
            headers.insert("apikey", value);
        }
        if returning {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
        }
        headers
    }

    fn collection_path(&self, collection: &str, filter: Option<&Filter>) -> String {
        let mut path = format!("/rest/v1/{}", collection);
        if let Some(filter) = filter {
            let params: Vec<String> = filter
                .conditions()
                .iter()
                .map(|c| {
                    format!(
                        "{}={}.{}",
                        c.field,
                        c.op.rest_prefix(),
                        urlencoding::encode(&c.value)
                    )
                })
                .collect();
            if !params.is_empty() {
                path.push('?');
                path.push_str(&params.join("&"));
            }
        }
        path
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        returning: bool,
    ) -> Result<Vec<Value>, StorageError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Store request {} {}", method, url);

        let mut req = self
            .client
            .request(method.clone(), &url)
            .headers(self.headers(returning));
        if let Some(body) = body {
            req = req.json(&body);
        }

        let response = req
            .send()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            return Err(StorageError::Conflict);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Store error ({}) on {} {}: {}", status, method, url, error_text);
            return Err(match status {
                StatusCode::NOT_FOUND => StorageError::NotFound,
                _ => StorageError::Unavailable(format!("{}: {}", status, error_text)),
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StorageError::InvalidRecord(e.to_string()))
    }

    fn to_document(value: Value) -> Result<Document, StorageError> {
        let id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| StorageError::InvalidRecord("record missing id".to_string()))?
            .to_string();
        Ok(Document { id, data: value })
    }
}

#[async_trait]
impl DocumentStore for RestDocumentStore {
    fn supports_range_filters(&self) -> bool {
        self.range_filters
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StorageError> {
        let path = self.collection_path(collection, Some(filter));
        let rows = self.request(Method::GET, &path, None, false).await?;
        rows.into_iter().map(Self::to_document).collect()
    }

    async fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let filter = Filter::new().eq("id", id);
        let mut rows = self.find(collection, &filter).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.remove(0))
        })
    }

    async fn insert(&self, collection: &str, data: Value) -> Result<Document, StorageError> {
        let path = self.collection_path(collection, None);
        let rows = self.request(Method::POST, &path, Some(data), true).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StorageError::Unavailable("insert returned no row".to_string()))
            .and_then(Self::to_document)
    }

    async fn insert_if_vacant(
        &self,
        collection: &str,
        guard: &Filter,
        data: Value,
    ) -> Result<InsertOutcome, StorageError> {
        // Best-effort pre-check. Without a backend unique index this is
        // racy; the index (when present) makes the POST below the real
        // arbiter by answering 409 to the loser.
        let existing = self.find(collection, guard).await?;
        if !existing.is_empty() {
            return Ok(InsertOutcome::Occupied);
        }

        match self.insert(collection, data).await {
            Ok(doc) => Ok(InsertOutcome::Created(doc)),
            Err(StorageError::Conflict) => {
                warn!("Conditional insert lost the race on {}", collection);
                Ok(InsertOutcome::Occupied)
            }
            Err(e) => Err(e),
        }
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Value,
    ) -> Result<Document, StorageError> {
        let filter = Filter::new().eq("id", id);
        let path = self.collection_path(collection, Some(&filter));
        let rows = self.request(Method::PATCH, &path, Some(patch), true).await?;
        rows.into_iter()
            .next()
            .ok_or(StorageError::NotFound)
            .and_then(Self::to_document)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StorageError> {
        let filter = Filter::new().eq("id", id);
        let path = self.collection_path(collection, Some(&filter));
        // Ask for the deleted rows back: an empty set means the id matched
        // nothing, which callers must see as NotFound exactly as the
        // in-memory store reports it.
        let rows = self.request(Method::DELETE, &path, None, true).await?;
        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn batch_write(&self, ops: Vec<WriteOp>) -> Result<(), StorageError> {
        // The REST backend has no multi-op transaction endpoint, so batches
        // apply sequentially and a mid-batch failure leaves earlier writes
        // in place. The in-memory store is the all-or-nothing path.
        for op in ops {
            match op {
                WriteOp::Insert { collection, data } => {
                    self.insert(&collection, data).await?;
                }
                WriteOp::Delete { collection, id } => {
                    self.delete(&collection, &id).await?;
                }
            }
        }
        Ok(())
    }
}
