use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};

use crate::ai::extract_title;
use crate::config::API_KEY_ENV;
use crate::error::{AppError, Result};
use crate::format::wiki_href;
use crate::models::Article;

use super::state::AppState;
use super::views::{render_template, ArticleLink, ArticleTemplate, IndexTemplate, MessageTemplate};

/// Topic used when the search box is submitted empty.
pub const EMPTY_QUERY_TOPIC: &str = "The Void";
/// Topic written when "I'm Feeling Derpy" finds nothing cached.
pub const RANDOM_FALLBACK_TOPIC: &str = "Serendipity";
pub const IMAGE_SEARCH_TITLE: &str = "Image Search Result";

struct UploadedImage {
    bytes: Bytes,
    mime_type: String,
}

#[derive(Default)]
struct SearchForm {
    query: String,
    image: Option<UploadedImage>,
    derpy: bool,
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub async fn index(State(state): State<AppState>) -> Response {
    let recent = match state.cache.recent_fresh(state.recent_limit).await {
        Ok(articles) => articles.iter().map(ArticleLink::from).collect(),
        Err(e) => {
            tracing::warn!("Could not load recent articles: {}", e);
            Vec::new()
        }
    };
    render_template(IndexTemplate { recent }, StatusCode::OK)
}

pub async fn search(State(state): State<AppState>, multipart: Multipart) -> Result<Response> {
    let form = read_search_form(multipart).await?;

    if form.derpy {
        return feeling_derpy(&state).await;
    }

    if let Some(image) = form.image {
        return image_search(&state, image).await;
    }

    resolve_topic(&state, topic_or_sentinel(&form.query)).await
}

pub async fn wiki(State(state): State<AppState>, Path(topic): Path<String>) -> Result<Response> {
    resolve_topic(&state, topic_or_sentinel(&topic)).await
}

pub async fn article(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    match state.cache.get_by_id(id).await? {
        Some(article) => Ok(article_page(&article)),
        None => Err(AppError::NotFound(id)),
    }
}

/// Flags an article as outdated and sends the reader to a fresh version.
/// Unknown ids are ignored.
pub async fn report(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response> {
    let Some(article) = state.cache.get_by_id(id).await? else {
        tracing::debug!(id, "Ignoring report for unknown article");
        return Ok(Redirect::to("/").into_response());
    };

    match state.cache.mark_stale(id).await {
        Ok(()) => Ok(Redirect::to(&wiki_href(&article.query)).into_response()),
        Err(AppError::NotFound(_)) => Ok(Redirect::to("/").into_response()),
        Err(e) => Err(e),
    }
}

fn topic_or_sentinel(query: &str) -> &str {
    match query.trim() {
        "" => EMPTY_QUERY_TOPIC,
        topic => topic,
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    AppError::Other(anyhow::anyhow!("Malformed search form: {e}"))
}

async fn read_search_form(mut multipart: Multipart) -> Result<SearchForm> {
    let mut form = SearchForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "q" => form.query = field.text().await.map_err(multipart_error)?,
            "derpy" => form.derpy = true,
            "image" => {
                let has_file = field.file_name().is_some_and(|n| !n.is_empty());
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                if has_file && !bytes.is_empty() {
                    form.image = Some(UploadedImage { bytes, mime_type });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn article_page(article: &Article) -> Response {
    render_template(ArticleTemplate::from(article), StatusCode::OK)
}

fn missing_api_key() -> Response {
    render_template(
        MessageTemplate::new(
            "Configuration Error",
            format!(
                "API Key Missing. Set the {API_KEY_ENV} environment variable or add \
                 gemini_api_key to the config file. You can obtain a key from Google AI Studio."
            ),
        ),
        StatusCode::SERVICE_UNAVAILABLE,
    )
}

async fn feeling_derpy(state: &AppState) -> Result<Response> {
    match state.cache.pick_random_fresh().await {
        Ok(Some(article)) => {
            return Ok(Redirect::to(&format!("/article/{}", article.id)).into_response());
        }
        Ok(None) => tracing::info!("No cached articles yet, writing a fresh one"),
        Err(e) => tracing::warn!("Random pick failed: {}", e),
    }
    resolve_topic(state, RANDOM_FALLBACK_TOPIC).await
}

/// Image searches are never cached: there is no textual key to store them under.
async fn image_search(state: &AppState, image: UploadedImage) -> Result<Response> {
    let Some(generator) = &state.generator else {
        return Ok(missing_api_key());
    };

    let markdown = generator
        .generate_article_from_image(&image.bytes, &image.mime_type)
        .await?;
    let (title_hint, body) = extract_title(&markdown);
    let title = title_hint.unwrap_or_else(|| IMAGE_SEARCH_TITLE.to_string());

    tracing::info!("Wrote uncached article {:?} from an image", title);
    Ok(render_template(
        ArticleTemplate::unsaved(title, &body, None),
        StatusCode::OK,
    ))
}

/// Serves a fresh cached article for `topic`, or writes, stores and serves a
/// new one. Storage failures degrade to serving the article uncached.
async fn resolve_topic(state: &AppState, topic: &str) -> Result<Response> {
    let mut cacheable = true;

    match state.cache.lookup(topic).await {
        Ok(Some(article)) if article.is_fresh() => return Ok(article_page(&article)),
        Ok(Some(article)) => {
            tracing::info!(id = article.id, "Article for {:?} is stale, rewriting", topic);
        }
        Ok(None) => tracing::debug!("No article for {:?} yet", topic),
        Err(e) => {
            tracing::warn!("Cache lookup failed, writing without caching: {}", e);
            cacheable = false;
        }
    }

    let Some(generator) = &state.generator else {
        return Ok(missing_api_key());
    };

    if !generator.is_plausible(topic).await {
        tracing::info!("Declined implausible topic {:?}", topic);
        return Ok(render_template(
            MessageTemplate::new(
                "Article not found",
                format!("Derpedia does not have an article about {topic:?}, and will not invent one."),
            ),
            StatusCode::NOT_FOUND,
        ));
    }

    let generated = generator.generate_article(topic).await?;
    let title = generated
        .title_hint
        .unwrap_or_else(|| topic.to_string());
    let image = if state.generate_images {
        generator.generate_image(&title).await
    } else {
        None
    };

    if cacheable {
        match state
            .cache
            .upsert(topic, &title, &generated.body, image.as_deref())
            .await
        {
            Ok(article) => return Ok(article_page(&article)),
            Err(e) => tracing::warn!("Could not cache article for {:?}: {}", topic, e),
        }
    }

    Ok(render_template(
        ArticleTemplate::unsaved(title, &generated.body, image.as_deref()),
        StatusCode::OK,
    ))
}
