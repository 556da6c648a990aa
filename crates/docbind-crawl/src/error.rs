//! Error types for traversal and assembly.

use docbind_browser::BrowserError;
use docbind_markdown::MarkdownError;
use docbind_pdf::PdfError;

/// Error from crawling a site or assembling its output.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Browser-level failure.
    #[error(transparent)]
    Browser(#[from] BrowserError),

    /// PDF toolkit failure.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Markdown pipeline failure.
    #[error(transparent)]
    Markdown(#[from] MarkdownError),

    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Link map serialization failure.
    #[error("link map is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The menu root element was not found on the index page.
    #[error("menu root not found with selector {selector:?}")]
    MenuRootMissing {
        /// Selector the site profile expected to match.
        selector: String,
    },

    /// Assembly was requested with an empty artifact list.
    #[error("no artifacts were produced, nothing to assemble")]
    NothingProduced,
}
