mod gemini;

use async_trait::async_trait;

use crate::error::Result;

pub use gemini::{
    GeminiGenerator, GeminiSettings, DEFAULT_API_URL, DEFAULT_IMAGE_MODEL, DEFAULT_TEXT_MODEL,
};

/// Titles at or beyond this many characters are treated as body text.
const MAX_TITLE_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub title_hint: Option<String>,
    pub body: String,
}

impl GeneratedArticle {
    pub fn from_markdown(markdown: &str) -> Self {
        let (title_hint, body) = extract_title(markdown);
        Self { title_hint, body }
    }
}

/// Produces article text and illustrations for a topic.
///
/// Only `generate_article` and `generate_article_from_image` may fail;
/// image generation yields `None` and the plausibility check answers `true`
/// when the backend misbehaves.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate_article(&self, topic: &str) -> Result<GeneratedArticle>;

    async fn generate_article_from_image(&self, image: &[u8], mime_type: &str) -> Result<String>;

    async fn generate_image(&self, prompt: &str) -> Option<Vec<u8>>;

    async fn is_plausible(&self, topic: &str) -> bool;
}

/// Splits a leading `# Title` line off generated Markdown.
///
/// Returns the title and the remaining body when the first line is a
/// level-one heading shorter than [`MAX_TITLE_CHARS`]; otherwise no title and
/// the input unchanged.
pub fn extract_title(markdown: &str) -> (Option<String>, String) {
    let Some(rest) = markdown.strip_prefix("# ") else {
        return (None, markdown.to_string());
    };

    let (first_line, body) = rest.split_once('\n').unwrap_or((rest, ""));
    let candidate = first_line.trim();

    if candidate.is_empty() || candidate.chars().count() >= MAX_TITLE_CHARS {
        return (None, markdown.to_string());
    }

    (Some(candidate.to_string()), body.to_string())
}
