use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub id: i64,
    pub query: String,
    pub title: String,
    pub content: String,
    /// Base64-encoded PNG, absent when image generation failed or was skipped.
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl Article {
    pub fn is_fresh(&self) -> bool {
        !self.is_stale
    }
}

/// Row values handed to the store; keys are computed by the cache.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub query: String,
    pub query_key: String,
    pub title: String,
    pub title_key: String,
    pub content: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}
