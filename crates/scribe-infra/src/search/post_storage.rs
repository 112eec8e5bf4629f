//! Post storage on top of a document store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use scribe_core::context::Context;
use scribe_core::domain::Post;
use scribe_core::error::{BackendError, StorageError};
use scribe_core::ports::{DocumentStore, PostStorage, StoreResponse};

/// Fields covered by the keyword search.
const SEARCH_FIELDS: [&str; 3] = ["title", "text", "tags"];

/// Envelope the store wraps around a fetched document.
#[derive(Deserialize)]
struct Document {
    #[serde(rename = "_source")]
    source: Post,
}

/// Post storage backed by a [`DocumentStore`] index.
///
/// Every call is bounded by a fixed timeout, shortened further by the
/// caller's deadline, and aborted if the caller's context is cancelled.
pub struct ElasticPostStorage {
    store: Arc<dyn DocumentStore>,
    index: String,
    timeout: Duration,
}

impl ElasticPostStorage {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(store: Arc<dyn DocumentStore>, index: impl Into<String>) -> Self {
        Self {
            store,
            index: index.into(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one store call within the context's budget.
    async fn call<F>(&self, ctx: &Context, op: &'static str, fut: F) -> Result<StoreResponse, StorageError>
    where
        F: Future<Output = Result<StoreResponse, BackendError>> + Send,
    {
        if ctx.is_cancelled() {
            return Err(StorageError::storage(op, BackendError::Cancelled));
        }
        if ctx.remaining() == Some(Duration::ZERO) {
            tracing::warn!(op, index = %self.index, "Deadline passed before store call");
            return Err(StorageError::storage(op, BackendError::Timeout(Duration::ZERO)));
        }

        let budget = ctx.budget(self.timeout);
        let outcome = tokio::select! {
            biased;
            _ = ctx.cancelled() => Err(BackendError::Cancelled),
            res = tokio::time::timeout(budget, fut) => {
                res.unwrap_or(Err(BackendError::Timeout(budget)))
            }
        };

        match outcome {
            Ok(res) => {
                tracing::debug!(op, index = %self.index, status = res.status, "Store call completed");
                Ok(res)
            }
            Err(e) => {
                tracing::warn!(op, index = %self.index, error = %e, "Store call failed");
                Err(StorageError::storage(op, e))
            }
        }
    }
}

/// Map an answer onto the domain taxonomy.
///
/// `special` is the one status code with a domain meaning for the operation
/// and the error it becomes; any other error status is a storage failure.
fn check(
    op: &'static str,
    res: StoreResponse,
    special: Option<(u16, StorageError)>,
) -> Result<StoreResponse, StorageError> {
    if let Some((status, error)) = special {
        if res.status == status {
            return Err(error);
        }
    }
    if res.is_error() {
        return Err(StorageError::storage(op, res.into_error()));
    }
    Ok(res)
}

fn search_query(keyword: &str) -> Value {
    json!({
        "query": {
            "query_string": {
                "fields": SEARCH_FIELDS,
                "query": keyword,
            }
        }
    })
}

#[async_trait]
impl PostStorage for ElasticPostStorage {
    async fn insert(&self, ctx: &Context, post: Post) -> Result<(), StorageError> {
        const OP: &str = "insert";
        let body = serde_json::to_value(&post)
            .map_err(|e| StorageError::storage(OP, BackendError::Encode(e)))?;

        tracing::debug!(post_id = %post.id, "Inserting post");
        let res = self
            .call(ctx, OP, self.store.create(&self.index, &post.id, body))
            .await?;
        check(OP, res, Some((409, StorageError::Conflict)))?;
        Ok(())
    }

    async fn update(&self, ctx: &Context, post: Post) -> Result<(), StorageError> {
        const OP: &str = "update";
        let doc = serde_json::to_value(&post)
            .map_err(|e| StorageError::storage(OP, BackendError::Encode(e)))?;

        tracing::debug!(post_id = %post.id, "Updating post");
        let res = self
            .call(ctx, OP, self.store.update(&self.index, &post.id, json!({ "doc": doc })))
            .await?;
        check(OP, res, Some((404, StorageError::NotFound)))?;
        Ok(())
    }

    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), StorageError> {
        const OP: &str = "delete";
        tracing::debug!(post_id = %id, "Deleting post");
        let res = self.call(ctx, OP, self.store.delete(&self.index, id)).await?;
        check(OP, res, Some((404, StorageError::NotFound)))?;
        Ok(())
    }

    async fn find_one(&self, ctx: &Context, id: &str) -> Result<Post, StorageError> {
        const OP: &str = "find one";
        let res = self.call(ctx, OP, self.store.get(&self.index, id)).await?;
        let res = check(OP, res, Some((404, StorageError::NotFound)))?;

        let document: Document = serde_json::from_value(res.body)
            .map_err(|e| StorageError::storage(OP, BackendError::Decode(e)))?;
        Ok(document.source)
    }

    async fn search(&self, ctx: &Context, keyword: &str) -> Result<Value, StorageError> {
        const OP: &str = "search";
        let res = self
            .call(ctx, OP, self.store.search(&self.index, search_query(keyword)))
            .await?;
        let res = check(OP, res, None)?;
        Ok(res.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Instant;

    use crate::search::InMemoryDocumentStore;

    /// Answers every call with a fixed response and records request bodies.
    struct ScriptedStore {
        response: StoreResponse,
        delay: Option<Duration>,
        bodies: Mutex<Vec<Value>>,
    }

    impl ScriptedStore {
        fn answering(status: u16, body: Value) -> Arc<Self> {
            Arc::new(Self {
                response: StoreResponse::new(status, body),
                delay: None,
                bodies: Mutex::new(Vec::new()),
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                response: StoreResponse::new(200, json!({})),
                delay: Some(delay),
                bodies: Mutex::new(Vec::new()),
            })
        }

        async fn answer(&self, body: Value) -> Result<StoreResponse, BackendError> {
            self.bodies.lock().unwrap().push(body);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            Ok(self.response.clone())
        }
    }

    #[async_trait]
    impl DocumentStore for ScriptedStore {
        async fn create(&self, _: &str, _: &str, document: Value) -> Result<StoreResponse, BackendError> {
            self.answer(document).await
        }
        async fn update(&self, _: &str, _: &str, body: Value) -> Result<StoreResponse, BackendError> {
            self.answer(body).await
        }
        async fn delete(&self, _: &str, _: &str) -> Result<StoreResponse, BackendError> {
            self.answer(Value::Null).await
        }
        async fn get(&self, _: &str, _: &str) -> Result<StoreResponse, BackendError> {
            self.answer(Value::Null).await
        }
        async fn search(&self, _: &str, query: Value) -> Result<StoreResponse, BackendError> {
            self.answer(query).await
        }
        async fn index_exists(&self, _: &str) -> Result<bool, BackendError> {
            Ok(true)
        }
        async fn create_index(&self, _: &str) -> Result<StoreResponse, BackendError> {
            self.answer(Value::Null).await
        }
    }

    /// Fails every call at the transport level.
    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        async fn create(&self, _: &str, _: &str, _: Value) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn update(&self, _: &str, _: &str, _: Value) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn delete(&self, _: &str, _: &str) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn get(&self, _: &str, _: &str) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn search(&self, _: &str, _: Value) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn index_exists(&self, _: &str) -> Result<bool, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
        async fn create_index(&self, _: &str) -> Result<StoreResponse, BackendError> {
            Err(BackendError::Transport("connection refused".into()))
        }
    }

    fn storage(store: Arc<dyn DocumentStore>) -> ElasticPostStorage {
        ElasticPostStorage::new(store, "post")
    }

    fn sample_post() -> Post {
        Post::new("T".into(), "X".into(), vec!["a".into()])
    }

    #[tokio::test]
    async fn test_insert_conflict() {
        let storage = storage(ScriptedStore::answering(409, json!({"status": 409})));
        let err = storage
            .insert(&Context::background(), sample_post())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn test_insert_other_error_is_storage_failure() {
        let storage = storage(ScriptedStore::answering(400, json!({"error": "mapper_parsing_exception"})));
        let err = storage
            .insert(&Context::background(), sample_post())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Storage {
                op: "insert",
                source: BackendError::Status { status: 400, .. }
            }
        ));
    }

    #[tokio::test]
    async fn test_insert_404_is_not_not_found() {
        let storage = storage(ScriptedStore::answering(404, json!({})));
        let err = storage
            .insert(&Context::background(), sample_post())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Storage { .. }));
    }

    #[tokio::test]
    async fn test_update_wraps_post_in_doc() {
        let store = ScriptedStore::answering(200, json!({"result": "updated"}));
        let storage = storage(store.clone());
        let post = Post::revision("id-1".into(), "T".into(), "X".into(), vec![]);

        storage.update(&Context::background(), post).await.unwrap();

        let bodies = store.bodies.lock().unwrap();
        assert_eq!(bodies[0]["doc"]["id"], "id-1");
        assert_eq!(bodies[0]["doc"]["title"], "T");
        assert_eq!(bodies[0]["doc"]["text"], "X");
        assert!(bodies[0]["doc"].get("created_at").is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_not_found() {
        let ctx = Context::background();
        let storage = storage(ScriptedStore::answering(404, json!({"found": false})));
        let post = Post::revision("id-1".into(), String::new(), String::new(), vec![]);

        assert!(matches!(storage.update(&ctx, post).await, Err(StorageError::NotFound)));
        assert!(matches!(storage.delete(&ctx, "id-1").await, Err(StorageError::NotFound)));
        assert!(matches!(storage.find_one(&ctx, "id-1").await, Err(StorageError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_server_error() {
        let storage = storage(ScriptedStore::answering(503, Value::String("unavailable".into())));
        let err = storage
            .delete(&Context::background(), "id-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err.cause(),
            Some(BackendError::Status { status: 503, body }) if body == "unavailable"
        ));
    }

    #[tokio::test]
    async fn test_find_one_decodes_source() {
        let storage = storage(ScriptedStore::answering(
            200,
            json!({
                "_index": "post",
                "_id": "id-1",
                "found": true,
                "_source": {
                    "id": "id-1",
                    "title": "T",
                    "text": "X",
                    "tags": ["a", "b"],
                    "created_at": "2024-05-01T12:00:00Z"
                }
            }),
        ));

        let post = storage
            .find_one(&Context::background(), "id-1")
            .await
            .unwrap();

        assert_eq!(post.id, "id-1");
        assert_eq!(post.title, "T");
        assert_eq!(post.text, "X");
        assert_eq!(post.tags, vec!["a", "b"]);
        assert!(post.created_at.is_some());
    }

    #[tokio::test]
    async fn test_find_one_decode_failure() {
        let storage = storage(ScriptedStore::answering(200, json!({"found": true})));
        let err = storage
            .find_one(&Context::background(), "id-1")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StorageError::Storage {
                op: "find one",
                source: BackendError::Decode(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_search_sends_multi_field_query_and_returns_raw_body() {
        let envelope = json!({"hits": {"total": {"value": 0, "relation": "eq"}, "hits": []}});
        let store = ScriptedStore::answering(200, envelope.clone());
        let storage = storage(store.clone());

        let result = storage
            .search(&Context::background(), "rust")
            .await
            .unwrap();

        assert_eq!(result, envelope);
        let bodies = store.bodies.lock().unwrap();
        assert_eq!(bodies[0]["query"]["query_string"]["query"], "rust");
        assert_eq!(
            bodies[0]["query"]["query_string"]["fields"],
            json!(["title", "text", "tags"])
        );
    }

    #[tokio::test]
    async fn test_search_error_status() {
        let storage = storage(ScriptedStore::answering(404, json!({"error": "index_not_found_exception"})));
        let err = storage
            .search(&Context::background(), "rust")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Storage { op: "search", .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_storage_failure() {
        let storage = storage(Arc::new(UnreachableStore));
        let err = storage
            .find_one(&Context::background(), "id-1")
            .await
            .unwrap_err();
        assert!(matches!(err.cause(), Some(BackendError::Transport(_))));
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let storage = storage(ScriptedStore::slow(Duration::from_secs(5)))
            .with_timeout(Duration::from_millis(50));

        let err = storage
            .search(&Context::background(), "rust")
            .await
            .unwrap_err();

        assert!(matches!(
            err.cause(),
            Some(BackendError::Timeout(d)) if *d == Duration::from_millis(50)
        ));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_caller_deadline_shortens_budget() {
        let storage = storage(ScriptedStore::slow(Duration::from_secs(5)));
        let ctx = Context::with_timeout(Duration::from_millis(50));

        let err = storage.delete(&ctx, "id-1").await.unwrap_err();

        assert!(matches!(
            err.cause(),
            Some(BackendError::Timeout(d)) if *d <= Duration::from_millis(50)
        ));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_call() {
        let storage = storage(ScriptedStore::slow(Duration::from_secs(5)));
        let (ctx, handle) = Context::background().cancellable();

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (result, _) = tokio::join!(storage.find_one(&ctx, "id-1"), cancel);

        assert!(matches!(
            result.unwrap_err().cause(),
            Some(BackendError::Cancelled)
        ));
    }

    #[tokio::test]
    async fn test_already_cancelled_context_skips_store() {
        let store = ScriptedStore::answering(201, json!({}));
        let storage = storage(store.clone());
        let (ctx, handle) = Context::background().cancellable();
        handle.cancel();

        let err = storage.insert(&ctx, sample_post()).await.unwrap_err();

        assert!(matches!(err.cause(), Some(BackendError::Cancelled)));
        assert!(store.bodies.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_deadline_skips_store() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.create_index("post").await.unwrap();
        let storage = storage(store.clone());
        let post = sample_post();
        let ctx = Context::with_deadline(Instant::now() - Duration::from_secs(1));

        let err = storage.insert(&ctx, post.clone()).await.unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(err.cause(), Some(BackendError::Timeout(d)) if d.is_zero()));
        let res = store.get("post", &post.id).await.unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.body["found"], false);
    }

    #[tokio::test]
    async fn test_parent_cancellation_aborts_derived_call() {
        let storage = storage(ScriptedStore::slow(Duration::from_secs(5)));
        let (parent, handle) = Context::background().cancellable();
        let (ctx, _child_handle) = parent.cancellable();

        let cancel = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };
        let (result, _) = tokio::join!(storage.delete(&ctx, "id-1"), cancel);

        assert!(matches!(
            result.unwrap_err().cause(),
            Some(BackendError::Cancelled)
        ));
    }
}
