use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::{ContentGenerator, GeneratedArticle};

pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-preview-image-generation";

const ARTICLE_PROMPT: &str = "You are writing for the parody newspaper The Onion and have been asked \
to write an article in the style of Wikipedia. Start with a single '# ' title line. Wrap the names \
of related topics in double square brackets, like [[Topic]]. The topic is: ";

const IMAGE_ARTICLE_PROMPT: &str = "Write a parody article in the style of Wikipedia on the topic \
shown in the attached image. Start with a single '# ' title line.";

const ILLUSTRATION_PROMPT: &str =
    "Create a deadpan, encyclopedia-style illustration for a satirical article about: ";

const PLAUSIBILITY_PROMPT: &str = "Answer with YES or NO only. Is the following text something a \
person could plausibly look up in an encyclopedia (a thing, person, place, idea or phrase), rather \
than random keyboard noise? Text: ";

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub api_url: String,
    pub text_model: String,
    pub image_model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<Blob>,
}

impl GenerateResponse {
    fn parts(&self) -> impl Iterator<Item = &ResponsePart> {
        self.candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
    }

    fn text(&self) -> String {
        self.parts()
            .filter_map(|p| p.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }

    fn first_image(&self) -> Option<&Blob> {
        self.parts()
            .filter_map(|p| p.inline_data.as_ref())
            .find(|blob| blob.mime_type.starts_with("image/"))
    }
}

/// Content generator backed by the Gemini `generateContent` REST endpoint.
pub struct GeminiGenerator {
    client: Client,
    settings: GeminiSettings,
}

impl GeminiGenerator {
    pub fn new(settings: GeminiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self { client, settings })
    }

    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<Part>,
        generation_config: Option<GenerationConfig>,
    ) -> Result<GenerateResponse> {
        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config,
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.settings.api_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Generation(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn generate_text(&self, parts: Vec<Part>) -> Result<String> {
        let response = self
            .generate_content(&self.settings.text_model, parts, None)
            .await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(AppError::Generation("Gemini returned no text".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl ContentGenerator for GeminiGenerator {
    async fn generate_article(&self, topic: &str) -> Result<GeneratedArticle> {
        let text = self
            .generate_text(vec![Part::Text {
                text: format!("{ARTICLE_PROMPT}{topic}"),
            }])
            .await?;
        Ok(GeneratedArticle::from_markdown(&text))
    }

    async fn generate_article_from_image(&self, image: &[u8], mime_type: &str) -> Result<String> {
        self.generate_text(vec![
            Part::Text {
                text: IMAGE_ARTICLE_PROMPT.to_string(),
            },
            Part::InlineData {
                inline_data: Blob {
                    mime_type: mime_type.to_string(),
                    data: BASE64.encode(image),
                },
            },
        ])
        .await
    }

    async fn generate_image(&self, prompt: &str) -> Option<Vec<u8>> {
        let config = GenerationConfig {
            response_modalities: vec!["TEXT", "IMAGE"],
        };
        let parts = vec![Part::Text {
            text: format!("{ILLUSTRATION_PROMPT}{prompt}"),
        }];

        let response = match self
            .generate_content(&self.settings.image_model, parts, Some(config))
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Image generation failed: {}", e);
                return None;
            }
        };

        let blob = response.first_image()?;
        match BASE64.decode(&blob.data) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!("Image payload was not valid base64: {}", e);
                None
            }
        }
    }

    async fn is_plausible(&self, topic: &str) -> bool {
        let parts = vec![Part::Text {
            text: format!("{PLAUSIBILITY_PROMPT}{topic}"),
        }];
        match self.generate_text(parts).await {
            Ok(answer) => !answer.trim_start().to_ascii_uppercase().starts_with("NO"),
            Err(e) => {
                tracing::warn!("Plausibility check failed, allowing topic: {}", e);
                true
            }
        }
    }
}
