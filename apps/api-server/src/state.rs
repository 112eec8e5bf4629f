//! Application state - shared across all handlers.

use std::sync::Arc;

use scribe_core::PostService;
use scribe_core::error::StorageError;
use scribe_core::ports::{DocumentStore, PostStorage};
use scribe_infra::{ElasticPostStorage, InMemoryDocumentStore, SearchConfig, ensure_index};

#[cfg(feature = "elasticsearch")]
use scribe_infra::ElasticsearchClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
}

impl AppState {
    /// Connect the search backend, make sure the index exists and build the
    /// service on top of it.
    pub async fn new(config: &SearchConfig) -> Result<Self, StorageError> {
        let store = build_store(config)?;
        ensure_index(store.as_ref(), &config.index).await?;

        let storage = ElasticPostStorage::new(store, config.index.clone())
            .with_timeout(config.request_timeout);

        tracing::info!(
            index = %config.index,
            timeout_secs = config.request_timeout.as_secs(),
            "Application state initialized"
        );

        Ok(Self::with_storage(Arc::new(storage)))
    }

    pub fn with_storage(storage: Arc<dyn PostStorage>) -> Self {
        Self {
            posts: PostService::new(storage),
        }
    }
}

#[cfg(feature = "elasticsearch")]
fn build_store(config: &SearchConfig) -> Result<Arc<dyn DocumentStore>, StorageError> {
    match config.url.as_deref() {
        Some(url) => {
            let client =
                ElasticsearchClient::new(url, config).map_err(|e| StorageError::storage("connect", e))?;
            Ok(Arc::new(client))
        }
        None => {
            tracing::warn!("ELASTICSEARCH_URL not set. Running with in-memory document store.");
            Ok(Arc::new(InMemoryDocumentStore::new()))
        }
    }
}

#[cfg(not(feature = "elasticsearch"))]
fn build_store(_config: &SearchConfig) -> Result<Arc<dyn DocumentStore>, StorageError> {
    tracing::info!("Running without elasticsearch feature - using in-memory document store");
    Ok(Arc::new(InMemoryDocumentStore::new()))
}
