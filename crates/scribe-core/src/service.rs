//! Post service - identity, timestamps and entity shaping on top of storage.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::context::Context;
use crate::domain::Post;
use crate::error::{BackendError, StorageError};
use crate::ports::PostStorage;

/// Fields supplied when creating a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
}

/// Fields supplied when updating a post.
#[derive(Debug, Clone)]
pub struct PostChanges {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
}

/// A persisted post as returned to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<Post> for PostView {
    type Error = BackendError;

    fn try_from(post: Post) -> Result<Self, Self::Error> {
        let created_at = post
            .created_at
            .ok_or(BackendError::MissingField("created_at"))?;
        Ok(Self {
            id: post.id,
            title: post.title,
            text: post.text,
            tags: post.tags,
            created_at,
        })
    }
}

/// Stateless orchestration over a [`PostStorage`].
///
/// Errors from storage are returned unchanged.
#[derive(Clone)]
pub struct PostService {
    storage: Arc<dyn PostStorage>,
}

impl PostService {
    pub fn new(storage: Arc<dyn PostStorage>) -> Self {
        Self { storage }
    }

    /// Create a post and return its generated ID.
    pub async fn create(&self, ctx: &Context, req: NewPost) -> Result<String, StorageError> {
        let post = Post::new(req.title, req.text, req.tags);
        let id = post.id.clone();

        self.storage.insert(ctx, post).await?;

        tracing::debug!(post_id = %id, "Post created");
        Ok(id)
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: String,
        changes: PostChanges,
    ) -> Result<(), StorageError> {
        let post = Post::revision(id, changes.title, changes.text, changes.tags);
        self.storage.update(ctx, post).await
    }

    pub async fn delete(&self, ctx: &Context, id: &str) -> Result<(), StorageError> {
        self.storage.delete(ctx, id).await
    }

    /// Fetch a post. A stored document without a creation time is reported
    /// as a storage failure.
    pub async fn find(&self, ctx: &Context, id: &str) -> Result<PostView, StorageError> {
        let post = self.storage.find_one(ctx, id).await?;
        PostView::try_from(post).map_err(|e| StorageError::storage("find", e))
    }

    /// Search posts; the backend envelope is passed through as-is.
    pub async fn search(&self, ctx: &Context, keyword: &str) -> Result<Value, StorageError> {
        self.storage.search(ctx, keyword).await
    }
}
