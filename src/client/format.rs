//! Splits message text into plain and link segments for display.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

static URL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>]+").expect("URL pattern is valid"));

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\'', '"'];

/// A piece of a rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Link(String),
}

/// Splits `text` into plain and link segments
///
/// Only `http`/`https` URLs that parse are links; everything else,
/// including punctuation that ends a sentence after a URL, stays text.
pub fn format_message(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;

    for found in URL_PATTERN.find_iter(text) {
        let candidate = found.as_str().trim_end_matches(TRAILING_PUNCTUATION);
        let end = found.start() + candidate.len();
        if Url::parse(candidate).map_or(true, |url| url.host_str().is_none()) {
            continue;
        }
        push_text(&mut segments, &text[cursor..found.start()]);
        segments.push(Segment::Link(candidate.to_string()));
        cursor = end;
    }
    push_text(&mut segments, &text[cursor..]);
    segments
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if text.is_empty() {
        return;
    }
    match segments.last_mut() {
        Some(Segment::Text(previous)) => previous.push_str(text),
        _ => segments.push(Segment::Text(text.to_string())),
    }
}

/// A message ready for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub from_user: bool,
    pub segments: Vec<Segment>,
}

impl RenderedMessage {
    pub fn new(content: &str, from_user: bool) -> Self {
        RenderedMessage {
            from_user,
            segments: format_message(content),
        }
    }

    /// Escaped HTML with links opening in a new tab without an opener
    pub fn to_html(&self) -> String {
        let class = if self.from_user {
            "message user"
        } else {
            "message assistant"
        };
        let mut html = format!("<div class=\"{}\">", class);
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => html.push_str(&escape_html(text)),
                Segment::Link(url) => {
                    let url = escape_html(url);
                    html.push_str(&format!(
                        "<a href=\"{0}\" target=\"_blank\" rel=\"noopener noreferrer\">{0}</a>",
                        url
                    ));
                }
            }
        }
        html.push_str("</div>");
        html
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
