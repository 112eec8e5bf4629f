//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod document_store;
mod post_storage;

pub use document_store::{DocumentStore, StoreResponse};
pub use post_storage::PostStorage;
