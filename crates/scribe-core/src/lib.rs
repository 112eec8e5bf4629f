//! # Scribe Core
//!
//! The domain layer of the Scribe post service.
//! This crate contains the post entity, the storage error taxonomy, the ports
//! that infrastructure implements, and the service that drives them.
//! It performs no I/O of its own.

pub mod context;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use context::{CancelHandle, Context};
pub use error::{BackendError, StorageError};
pub use service::PostService;
