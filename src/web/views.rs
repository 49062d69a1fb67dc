use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::format::{render_article, wiki_href};
use crate::models::Article;

pub struct ArticleLink {
    pub title: String,
    pub href: String,
}

impl From<&Article> for ArticleLink {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            href: format!("/article/{}", article.id),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub recent: Vec<ArticleLink>,
}

#[derive(Template)]
#[template(path = "article.html")]
pub struct ArticleTemplate {
    pub title: String,
    pub content_html: String,
    pub image_src: Option<String>,
    pub article_id: Option<i64>,
    pub is_stale: bool,
}

impl ArticleTemplate {
    /// A page for an article that was not (or could not be) stored.
    pub fn unsaved(title: String, markdown: &str, image: Option<&[u8]>) -> Self {
        Self {
            title,
            content_html: render_article(markdown, wiki_href),
            image_src: image.map(|bytes| png_data_url(&BASE64.encode(bytes))),
            article_id: None,
            is_stale: false,
        }
    }
}

impl From<&Article> for ArticleTemplate {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            content_html: render_article(&article.content, wiki_href),
            image_src: article.image.as_deref().map(png_data_url),
            article_id: Some(article.id),
            is_stale: article.is_stale,
        }
    }
}

#[derive(Template)]
#[template(path = "message.html")]
pub struct MessageTemplate {
    pub title: String,
    pub message: String,
}

impl MessageTemplate {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

fn png_data_url(b64: &str) -> String {
    format!("data:image/png;base64,{b64}")
}

pub fn render_template<T: Template>(template: T, status: StatusCode) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(err) => {
            tracing::error!("Template rendering failed: {}", err);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template rendering failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article(image: Option<&str>, is_stale: bool) -> Article {
        Article {
            id: 7,
            query: "Dogzilla".to_string(),
            title: "Dogzilla".to_string(),
            content: "A very large [[Dog]].".to_string(),
            image: image.map(str::to_string),
            created_at: Utc::now(),
            is_stale,
        }
    }

    #[test]
    fn stored_article_page_has_report_form_and_links() {
        let html = ArticleTemplate::from(&article(None, false)).render().unwrap();
        assert!(html.contains("<h1>Dogzilla</h1>"));
        assert!(html.contains("/report/7"));
        assert!(html.contains(r#"<a href="/wiki/Dog">Dog</a>"#));
        assert!(!html.contains("reported as outdated"));
        assert!(!html.contains("<img"));
    }

    #[test]
    fn stale_article_page_shows_notice_and_image() {
        let html = ArticleTemplate::from(&article(Some("iVBORw=="), true))
            .render()
            .unwrap();
        assert!(html.contains("reported as outdated"));
        assert!(html.contains("data:image/png;base64,iVBORw=="));
    }

    #[test]
    fn unsaved_article_has_no_report_form() {
        let html = ArticleTemplate::unsaved("Image Search Result".to_string(), "Body", None)
            .render()
            .unwrap();
        assert!(html.contains("This article was not saved."));
        assert!(!html.contains("/report/"));
    }

    #[test]
    fn titles_are_escaped() {
        let html = MessageTemplate::new("<b>Bold</b>", "x").render().unwrap();
        assert!(html.contains("&#60;b&#62;Bold&#60;/b&#62;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn index_accepts_pasted_images_and_keeps_derpy_submittable() {
        let html = IndexTemplate { recent: Vec::new() }.render().unwrap();
        assert!(html.contains("id=\"image-preview-container\" hidden"));
        assert!(html.contains("addEventListener('paste'"));
        assert!(html.contains("name=\"derpy\""));
        assert!(!html.contains(".disabled = true"));
    }
}
