//! Query resolution and caching of generated articles.
//!
//! Topics are compared after trimming and Unicode lowercasing. A lookup
//! first tries an exact match on the stored query, then falls back to the
//! newest article whose title contains the topic. Stale articles are still
//! returned by [`ArticleCache::lookup`] so the caller can decide to
//! regenerate; they are excluded from random and recent listings.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;

use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{Article, NewArticle};

/// Case-folded, trimmed form of a topic used for every comparison.
pub fn normalize_topic(topic: &str) -> String {
    topic.trim().to_lowercase()
}

#[derive(Clone)]
pub struct ArticleCache {
    repository: Repository,
}

impl ArticleCache {
    pub async fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let repository = Repository::new(db_path).await?;
        Ok(Self::new(repository))
    }

    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn lookup(&self, topic: &str) -> Result<Option<Article>> {
        let key = normalize_topic(topic);
        if key.is_empty() {
            return Ok(None);
        }

        if let Some(article) = self.repository.find_by_query_key(key.clone()).await? {
            tracing::debug!(id = article.id, "Exact cache hit for {:?}", topic);
            return Ok(Some(article));
        }

        let article = self.repository.find_by_title_containing(key).await?;
        if let Some(article) = &article {
            tracing::debug!(id = article.id, "Title match {:?} for {:?}", article.title, topic);
        }
        Ok(article)
    }

    /// Stores a freshly generated article for `topic`, replacing any earlier
    /// version in place. Returns the row as persisted.
    pub async fn upsert(
        &self,
        topic: &str,
        title: &str,
        content: &str,
        image: Option<&[u8]>,
    ) -> Result<Article> {
        let query = topic.trim();
        let query_key = normalize_topic(query);
        if query_key.is_empty() {
            return Err(AppError::InvalidTopic);
        }

        let article = NewArticle {
            query: query.to_string(),
            query_key,
            title: title.to_string(),
            title_key: title.to_lowercase(),
            content: content.to_string(),
            image: image.map(|bytes| BASE64.encode(bytes)),
            created_at: Utc::now(),
        };

        let stored = self.repository.upsert_article(article).await?;
        tracing::info!(id = stored.id, "Cached article {:?}", stored.query);
        Ok(stored)
    }

    pub async fn mark_stale(&self, id: i64) -> Result<()> {
        match self.repository.mark_article_stale(id).await? {
            0 => Err(AppError::NotFound(id)),
            _ => {
                tracing::info!(id, "Article marked stale");
                Ok(())
            }
        }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Article>> {
        self.repository.get_article(id).await
    }

    pub async fn pick_random_fresh(&self) -> Result<Option<Article>> {
        self.repository.random_fresh_article().await
    }

    pub async fn recent_fresh(&self, limit: usize) -> Result<Vec<Article>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.repository.recent_fresh_articles(limit).await
    }

    #[cfg(test)]
    pub(crate) fn repository(&self) -> &Repository {
        &self.repository
    }
}
