//! Document store port - the search engine client the storage adapter drives.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;

/// Raw answer from the document store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreResponse {
    pub status: u16,
    pub body: Value,
}

impl StoreResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Anything above the 2xx range counts as an error answer.
    pub fn is_error(&self) -> bool {
        self.status > 299
    }

    /// Turn an error answer into a backend failure cause.
    pub fn into_error(self) -> BackendError {
        let body = match self.body {
            Value::String(text) => text,
            other => other.to_string(),
        };
        BackendError::Status {
            status: self.status,
            body,
        }
    }
}

/// Document store trait - abstraction over search engine backends
/// (Elasticsearch, in-memory).
///
/// Implementations return `Err` only when no answer was obtained.
/// Error statuses come back as a normal `StoreResponse`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document; the store answers 409 if the ID already exists.
    async fn create(&self, index: &str, id: &str, document: Value) -> Result<StoreResponse, BackendError>;

    /// Partial update; `body` is the update request, e.g. `{"doc": {...}}`.
    async fn update(&self, index: &str, id: &str, body: Value) -> Result<StoreResponse, BackendError>;

    async fn delete(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError>;

    /// Fetch a document wrapped in the store's metadata envelope.
    async fn get(&self, index: &str, id: &str) -> Result<StoreResponse, BackendError>;

    /// Run a search request body against the index, tracking total hits.
    async fn search(&self, index: &str, query: Value) -> Result<StoreResponse, BackendError>;

    async fn index_exists(&self, index: &str) -> Result<bool, BackendError>;

    async fn create_index(&self, index: &str) -> Result<StoreResponse, BackendError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_error_above_2xx() {
        assert!(!StoreResponse::new(201, Value::Null).is_error());
        assert!(StoreResponse::new(404, Value::Null).is_error());
        assert!(StoreResponse::new(301, Value::Null).is_error());
    }

    #[test]
    fn test_into_error_keeps_body_text() {
        let err = StoreResponse::new(500, json!({"error": "shard failure"})).into_error();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("shard failure"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
