use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a titled text document with tags.
///
/// `created_at` is only set on posts that have been created through
/// [`Post::new`] or read back from storage. It is skipped during
/// serialization when absent so that merge updates never overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    /// Create a new post with a generated ID and creation time.
    pub fn new(title: String, text: String, tags: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            text,
            tags,
            created_at: Some(Utc::now()),
        }
    }

    /// Build the replacement fields for an existing post.
    pub fn revision(id: String, title: String, text: String, tags: Vec<String>) -> Self {
        Self {
            id,
            title,
            text,
            tags,
            created_at: None,
        }
    }
}
