use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Article store unavailable: {0}")]
    StoreUnavailable(#[from] tokio_rusqlite::Error),

    #[error("No article with id {0}")]
    NotFound(i64),

    #[error("Topic is empty after normalization")]
    InvalidTopic,

    #[error("Article generation failed: {0}")]
    Generation(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
