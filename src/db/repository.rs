use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, NewArticle};

use super::schema::SCHEMA;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const ARTICLE_COLUMNS: &str =
    "id, query, title, content_md, image_b64, created_at, is_stale";

/// Plain CRUD over the `articles` table. Normalization and matching policy
/// live in [`crate::cache::ArticleCache`].
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            tracing::debug!("SQLite journal mode: {}", mode);
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub async fn find_by_query_key(&self, query_key: String) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE query_key = ?1");
                let article = conn
                    .query_row(&sql, params![query_key], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Most recently created article whose lowercased title contains `needle`.
    pub async fn find_by_title_containing(&self, needle: String) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles
                     WHERE instr(title_key, ?1) > 0
                     ORDER BY created_at DESC, id DESC
                     LIMIT 1"
                );
                let article = conn
                    .query_row(&sql, params![needle], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(move |conn| {
                let sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles WHERE id = ?1");
                let article = conn
                    .query_row(&sql, params![id], article_from_row)
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Inserts a row, or refreshes the existing row with the same `query_key`
    /// in place. The conflict clause turns a lost insert race into an update.
    pub async fn upsert_article(&self, article: NewArticle) -> Result<Article> {
        let stored = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                let sql = format!(
                    r#"INSERT INTO articles (query, query_key, title, title_key, content_md, image_b64, created_at, is_stale)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)
                       ON CONFLICT(query_key) DO UPDATE SET
                           title = excluded.title,
                           title_key = excluded.title_key,
                           content_md = excluded.content_md,
                           image_b64 = excluded.image_b64,
                           created_at = excluded.created_at,
                           is_stale = 0
                       RETURNING {ARTICLE_COLUMNS}"#
                );
                let stored = tx.query_row(
                    &sql,
                    params![
                        article.query,
                        article.query_key,
                        article.title,
                        article.title_key,
                        article.content,
                        article.image,
                        format_datetime(&article.created_at),
                    ],
                    article_from_row,
                )?;
                tx.commit()?;
                Ok(stored)
            })
            .await?;
        Ok(stored)
    }

    /// Returns the number of rows touched (0 or 1).
    pub async fn mark_article_stale(&self, id: i64) -> Result<usize> {
        let changed = self
            .conn
            .call(move |conn| {
                let changed =
                    conn.execute("UPDATE articles SET is_stale = 1 WHERE id = ?1", params![id])?;
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    pub async fn random_fresh_article(&self) -> Result<Option<Article>> {
        let article = self
            .conn
            .call(|conn| {
                let sql = format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles WHERE is_stale = 0 ORDER BY RANDOM() LIMIT 1"
                );
                let article = conn.query_row(&sql, [], article_from_row).optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    pub async fn recent_fresh_articles(&self, limit: usize) -> Result<Vec<Article>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let articles = self
            .conn
            .call(move |conn| {
                let sql = format!(
                    "SELECT {ARTICLE_COLUMNS} FROM articles
                     WHERE is_stale = 0
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?1"
                );
                let mut stmt = conn.prepare(&sql)?;
                let articles = stmt
                    .query_map(params![limit], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    #[cfg(test)]
    pub async fn count_articles(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count = conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        query: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        image: row.get(4)?,
        created_at: parse_datetime(5, &row.get::<_, String>(5)?)?,
        is_stale: row.get::<_, i64>(6)? != 0,
    })
}
