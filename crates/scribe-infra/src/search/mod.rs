//! Post storage on a search engine - Elasticsearch and in-memory fallback.

mod bootstrap;
mod config;
mod memory;
mod post_storage;

#[cfg(feature = "elasticsearch")]
mod client;

pub use bootstrap::ensure_index;
pub use config::SearchConfig;
pub use memory::InMemoryDocumentStore;
pub use post_storage::ElasticPostStorage;

#[cfg(feature = "elasticsearch")]
pub use client::ElasticsearchClient;
