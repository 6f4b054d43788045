//! Decorative HTML snippets returned to the browser in the `code` field.
//! Cards are askama templates under `templates/`, so every interpolated value is escaped.

use askama::Template;
use regex::{Regex, RegexBuilder};
use story_core::{Story, Theme};

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorCard<'a> {
    message: &'a str,
    details: &'a str,
}

#[derive(Template)]
#[template(path = "image.html")]
struct ImageCard<'a> {
    image_url: &'a str,
    prompt: &'a str,
    language_instruction: Option<&'a str>,
}

#[derive(Template)]
#[template(path = "story.html")]
struct StoryCard<'a> {
    title: &'a str,
    theme: Theme,
    paragraphs: Vec<&'a str>,
}

struct Segment<'a> {
    text: &'a str,
    hit: bool,
}

#[derive(Template)]
#[template(
    source = "{% for part in parts %}{% if part.hit %}<em>{{ part.text }}</em>{% else %}{{ part.text }}{% endif %}{% endfor %}",
    ext = "html"
)]
struct Highlighted<'a> {
    parts: Vec<Segment<'a>>,
}

/// Never fails: error responses must always carry some HTML.
pub fn error_html(message: &str, details: &str) -> String {
    ErrorCard { message, details }.render().unwrap_or_else(|err| {
        tracing::error!(%err, "failed to render error card");
        String::from("<div>Oops! Something went wrong</div>")
    })
}

/// Wraps a generated image. `language_instruction` becomes a leading HTML comment.
pub fn image_html(image_url: &str, prompt: &str, language_instruction: Option<&str>) -> askama::Result<String> {
    ImageCard { image_url, prompt, language_instruction }.render()
}

pub fn story_html(story: &Story) -> askama::Result<String> {
    let paragraphs = story.content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect();
    StoryCard { title: &story.title, theme: story.theme, paragraphs }.render()
}

/// Removes a surrounding Markdown code fence (```html ... ```), if any.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim().to_string()
}

/// Up to ~300 chars of `text` around the first occurrence of any term, escaped, with
/// every term occurrence wrapped in `<em>`.
pub fn snippet(text: &str, terms: &[String]) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let pattern = terms_pattern(terms);
    let window = match pattern.as_ref().and_then(|re| re.find(text)).map(|m| m.start()) {
        Some(idx) => {
            let start = floor_boundary(text, idx.saturating_sub(100));
            let end = floor_boundary(text, (idx + 200).min(text.len()));
            &text[start..end]
        }
        None => {
            let end = text.char_indices().nth(200).map_or(text.len(), |(i, _)| i);
            &text[..end]
        }
    };
    let parts = match &pattern {
        Some(re) => segments(window, re),
        None => vec![Segment { text: window, hit: false }],
    };
    match (Highlighted { parts }).render() {
        Ok(html) => Some(html),
        Err(err) => {
            tracing::warn!(%err, "failed to render snippet");
            None
        }
    }
}

/// One case-insensitive alternation over all terms, longest first.
fn terms_pattern(terms: &[String]) -> Option<Regex> {
    let mut terms: Vec<&str> = terms.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect();
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    terms.dedup();
    let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&alternation).case_insensitive(true).build().ok()
}

/// Splits raw `text` into plain and matched runs; escaping happens at render time.
fn segments<'a>(text: &'a str, re: &Regex) -> Vec<Segment<'a>> {
    let mut parts = Vec::new();
    let mut last = 0;
    for m in re.find_iter(text) {
        if m.start() > last {
            parts.push(Segment { text: &text[last..m.start()], hit: false });
        }
        parts.push(Segment { text: m.as_str(), hit: true });
        last = m.end();
    }
    if last < text.len() {
        parts.push(Segment { text: &text[last..], hit: false });
    }
    parts
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
