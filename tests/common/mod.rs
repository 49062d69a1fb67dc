#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use derpedia::ai::{ContentGenerator, GeneratedArticle};
use derpedia::cache::ArticleCache;
use derpedia::db::Repository;
use derpedia::error::{AppError, Result};
use derpedia::web::{create_router, AppState};

pub const BOUNDARY: &str = "derpedia-test-boundary";

/// Scripted generator that records what it was asked to write.
#[derive(Default)]
pub struct FakeGenerator {
    pub topics: Mutex<Vec<String>>,
    pub article_calls: AtomicUsize,
    pub image_article_calls: AtomicUsize,
    pub image_calls: AtomicUsize,
    pub implausible: bool,
    pub fail_generation: bool,
    pub image: Option<Vec<u8>>,
    pub image_markdown: Option<String>,
}

impl FakeGenerator {
    pub fn article_calls(&self) -> usize {
        self.article_calls.load(Ordering::SeqCst)
    }

    pub fn image_article_calls(&self) -> usize {
        self.image_article_calls.load(Ordering::SeqCst)
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentGenerator for FakeGenerator {
    async fn generate_article(&self, topic: &str) -> Result<GeneratedArticle> {
        self.article_calls.fetch_add(1, Ordering::SeqCst);
        self.topics.lock().unwrap().push(topic.to_string());
        if self.fail_generation {
            return Err(AppError::Generation("model is asleep".to_string()));
        }
        let version = self.article_calls();
        Ok(GeneratedArticle::from_markdown(&format!(
            "# {topic} Encyclopedia Entry\n\nVersion {version} about [[Related Things]]."
        )))
    }

    async fn generate_article_from_image(&self, _image: &[u8], _mime_type: &str) -> Result<String> {
        self.image_article_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .image_markdown
            .clone()
            .unwrap_or_else(|| "A photograph of a suspicious cat.".to_string()))
    }

    async fn generate_image(&self, _prompt: &str) -> Option<Vec<u8>> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        self.image.clone()
    }

    async fn is_plausible(&self, _topic: &str) -> bool {
        !self.implausible
    }
}

/// Drops the table the cache reads and writes.
pub const DROP_ARTICLES: &str = "DROP TABLE articles;";
/// Leaves reads working but rejects every insert.
pub const REJECT_INSERTS: &str = "CREATE TRIGGER reject_inserts BEFORE INSERT ON articles \
     BEGIN SELECT RAISE(ABORT, 'disk is made of cheese'); END;";

pub struct TestApp {
    pub router: Router,
    pub cache: ArticleCache,
    pub generator: Arc<FakeGenerator>,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub async fn new(generator: FakeGenerator) -> Self {
        let cache = ArticleCache::new(Repository::open_in_memory().await.unwrap());
        Self::build(cache, Some(Arc::new(generator)), None)
    }

    pub async fn without_generator() -> Self {
        let cache = ArticleCache::new(Repository::open_in_memory().await.unwrap());
        Self::build(cache, None, None)
    }

    /// Opens a file-backed store, then runs `sql` on it behind the cache's back.
    pub async fn with_damaged_store(generator: FakeGenerator, sql: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("derpedia.db");
        let cache = ArticleCache::open(&db_path).await.unwrap();

        let conn = rusqlite::Connection::open(&db_path).unwrap();
        conn.execute_batch(sql).unwrap();
        drop(conn);

        Self::build(cache, Some(Arc::new(generator)), Some(dir))
    }

    fn build(cache: ArticleCache, generator: Option<Arc<FakeGenerator>>, dir: Option<TempDir>) -> Self {
        let state = AppState::new(
            cache.clone(),
            generator
                .clone()
                .map(|g| g as Arc<dyn ContentGenerator>),
        );
        Self {
            router: create_router(state),
            cache,
            generator: generator.unwrap_or_default(),
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, String) {
        let response = self
            .send(Request::get(uri).body(Body::empty()).unwrap())
            .await;
        read(response).await
    }

    pub async fn search(&self, fields: &[(&str, &str)]) -> Response<Body> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.send(multipart_request(body)).await
    }

    pub async fn search_image(&self, image: &[u8], mime_type: &str) -> Response<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"q\"\r\n\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"upload.png\"\r\nContent-Type: {mime_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(image);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        self.send(multipart_request(body)).await
    }

    pub async fn post(&self, uri: &str) -> Response<Body> {
        self.send(Request::post(uri).body(Body::empty()).unwrap())
            .await
    }
}

fn multipart_request(body: Vec<u8>) -> Request<Body> {
    Request::post("/search")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub async fn read(response: Response<Body>) -> (StatusCode, String) {
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
