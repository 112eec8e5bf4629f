//! # Scribe Infrastructure
//!
//! Concrete implementations of the ports defined in `scribe-core`.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory store only
//! - `elasticsearch` - Elasticsearch REST client via reqwest

pub mod search;

// Re-exports
pub use search::{ElasticPostStorage, InMemoryDocumentStore, SearchConfig, ensure_index};

#[cfg(feature = "elasticsearch")]
pub use search::ElasticsearchClient;
