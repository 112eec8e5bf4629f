//! Storage error taxonomy shared by every layer.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by post storage.
///
/// Only the two store answers with an unambiguous domain meaning get their own
/// variant. Everything else is a `Storage` failure carrying the cause.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document already exists")]
    Conflict,

    #[error("Document not found")]
    NotFound,

    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: BackendError,
    },
}

impl StorageError {
    /// Wrap a backend failure for the given operation.
    pub fn storage(op: &'static str, source: BackendError) -> Self {
        Self::Storage { op, source }
    }

    /// The underlying cause, if this is an opaque storage failure.
    pub fn cause(&self) -> Option<&BackendError> {
        match self {
            Self::Storage { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the failure came from the call running out of time or being
    /// cancelled by the caller.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.cause(),
            Some(BackendError::Timeout(_) | BackendError::Cancelled)
        )
    }
}

/// Causes of an opaque storage failure.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("request cancelled")]
    Cancelled,

    #[error("response: [{status}] {body}")]
    Status { status: u16, body: String },

    #[error("encode: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decode: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("document is missing field `{0}`")]
    MissingField(&'static str),
}
