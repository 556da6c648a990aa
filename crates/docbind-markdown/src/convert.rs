//! HTML fragment to Markdown conversion.

use std::sync::LazyLock;

use htmd::HtmlToMarkdown;
use regex::Regex;

use crate::MarkdownError;

/// Strikethrough tags, replaced with `~~` before conversion so the markup
/// survives as GFM strikethrough instead of being dropped as plain text.
static STRIKE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</?(?:del|strike|s)(?:>|\s[^>]*>)").unwrap());

/// Converts cleaned article HTML to Markdown.
pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        Self {
            inner: HtmlToMarkdown::builder()
                .skip_tags(vec!["script", "style"])
                .build(),
        }
    }

    /// Convert an HTML fragment to Markdown.
    pub fn to_markdown(&self, html: &str) -> Result<String, MarkdownError> {
        let prepared = STRIKE_PATTERN.replace_all(html, "~~");
        self.inner
            .convert(&prepared)
            .map_err(|e| MarkdownError::Convert(e.to_string()))
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Prepend a front matter block carrying the document title and, when
/// given, its sibling index as a sort key, unless the document already
/// starts with one.
pub fn with_front_matter(markdown: &str, title: &str, position: Option<usize>) -> String {
    if markdown.starts_with("---\n") {
        return markdown.to_owned();
    }
    match position {
        Some(position) => {
            format!("---\ntitle: {title}\nsidebar_position: {position}\n---\n\n{markdown}")
        }
        None => format!("---\ntitle: {title}\n---\n\n{markdown}"),
    }
}
