//! Markdown rendering for streamed answers.

use std::collections::{HashMap, HashSet};

use pulldown_cmark::{Event, Options, Parser, html};

/// Turns raw answer text into display markup.
///
/// Implementations are stateless and only ever see raw source text, never
/// their own output.
pub trait RenderAdapter: Send + Sync {
    fn render(&self, raw: &str) -> String;
}

/// Default adapter: CommonMark to sanitized HTML, one visual line per source line.
#[derive(Clone, Copy, Debug, Default)]
pub struct MarkdownRenderer;

impl RenderAdapter for MarkdownRenderer {
    fn render(&self, raw: &str) -> String {
        markdown_to_html(raw)
    }
}

#[must_use]
pub fn markdown_to_html(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    // Model output puts one thought per line; keep those lines apart.
    let parser = Parser::new_ext(input, options).map(|event| match event {
        Event::SoftBreak => Event::HardBreak,
        other => other,
    });
    let mut out = String::new();
    html::push_html(&mut out, parser);
    sanitize_html(&out)
}

#[must_use]
pub fn sanitize_html(html: &str) -> String {
    let tags: HashSet<&str> = [
        "p", "div", "span", "br", "em", "strong", "b", "i", "del", "code", "pre", "blockquote",
        "ul", "ol", "li", "a", "h1", "h2", "h3", "h4",
    ]
    .into_iter()
    .collect();

    let mut attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    attributes.insert("a", ["href"].into_iter().collect());

    ammonia::Builder::new()
        .tags(tags)
        .tag_attributes(attributes)
        .clean(html)
        .to_string()
}
