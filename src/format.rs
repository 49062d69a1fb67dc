//! Markdown to HTML conversion for generated articles.

use std::sync::OnceLock;

use pulldown_cmark::{html, Event, Options, Parser};
use regex::{Captures, Regex};

static WIKI_LINK: OnceLock<Regex> = OnceLock::new();

fn wiki_link_pattern() -> &'static Regex {
    WIKI_LINK.get_or_init(|| {
        Regex::new(r"\[\[([^\[\]|\n]+)(?:\|([^\[\]\n]+))?\]\]").expect("wiki link pattern is valid")
    })
}

/// Link target for an article topic.
pub fn wiki_href(topic: &str) -> String {
    format!("/wiki/{}", urlencoding::encode(topic.trim()))
}

/// Rewrites `[[Topic]]` and `[[Topic|label]]` into Markdown links, asking
/// `resolve` for each target.
pub fn rewrite_wiki_links<F>(markdown: &str, resolve: F) -> String
where
    F: Fn(&str) -> String,
{
    wiki_link_pattern()
        .replace_all(markdown, |caps: &Captures| {
            let target = caps[1].trim();
            let label = caps.get(2).map_or(target, |m| m.as_str().trim());
            format!("[{}](<{}>)", label, resolve(target))
        })
        .into_owned()
}

/// Renders generated Markdown to HTML. Raw HTML in the input is escaped.
pub fn render_article<F>(markdown: &str, resolve: F) -> String
where
    F: Fn(&str) -> String,
{
    let linked = rewrite_wiki_links(markdown, resolve);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(&linked, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut output = String::with_capacity(linked.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}
