//! Error types for the Markdown pipeline.

/// Error from content extraction, image localization, or conversion.
#[derive(Debug, thiserror::Error)]
pub enum MarkdownError {
    /// A CSS selector in the content rules could not be parsed.
    #[error("invalid selector: {0}")]
    Selector(String),

    /// The content selector matched nothing on the page.
    #[error("no element matched content selector {selector:?}")]
    MissingContent {
        /// Selector that was expected to match the article body.
        selector: String,
    },

    /// An image download failed. Transport failures carry status 0.
    #[error("image fetch from {url} failed (status {status}): {message}")]
    Http {
        /// URL the fetch was issued against.
        url: String,
        /// HTTP status, or 0 when the request never completed.
        status: u16,
        /// Response body or transport error.
        message: String,
    },

    /// HTML to Markdown conversion failed.
    #[error("markdown conversion failed: {0}")]
    Convert(String),

    /// Filesystem failure while writing media files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
