//! Index bootstrap - make sure the post index exists before serving.

use scribe_core::error::{BackendError, StorageError};
use scribe_core::ports::DocumentStore;

/// Create `index` unless it already exists.
pub async fn ensure_index(store: &dyn DocumentStore, index: &str) -> Result<(), StorageError> {
    const OP: &str = "create index";

    if store
        .index_exists(index)
        .await
        .map_err(|e| StorageError::storage(OP, e))?
    {
        tracing::debug!(index, "Index already exists");
        return Ok(());
    }

    let res = store
        .create_index(index)
        .await
        .map_err(|e| StorageError::storage(OP, e))?;
    if res.is_error() {
        return Err(StorageError::storage(OP, res.into_error()));
    }

    tracing::info!(index, "Index created");
    Ok(())
}
