use async_trait::async_trait;

use crate::context::Context;
use crate::domain::Post;
use crate::error::StorageError;

/// Post storage - the five document operations the service relies on.
#[async_trait]
pub trait PostStorage: Send + Sync {
    /// Store a new post under its ID. Fails with `Conflict` if the ID is taken.
    async fn insert(&self, ctx: &Context, post: Post) -> Result<(), StorageError>;

    /// Merge the post's fields into the stored document with the same ID.
    async fn update(&self, ctx: &Context, post: Post) -> Result<(), StorageError>;

    /// Delete the post with the given ID.
    async fn delete(&self, ctx: &Context, id: &str) -> Result<(), StorageError>;

    /// Fetch a single post by ID.
    async fn find_one(&self, ctx: &Context, id: &str) -> Result<Post, StorageError>;

    /// Run a text query over title, text and tags.
    /// Returns the backend's native response envelope.
    async fn search(&self, ctx: &Context, keyword: &str) -> Result<serde_json::Value, StorageError>;
}
