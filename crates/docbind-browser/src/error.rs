//! Error types for browser control.

/// Error from renderer operations.
///
/// The underlying browser library reports failures as opaque dynamic
/// errors; their display strings are captured here so the trait surface
/// stays object-safe and the mock can produce identical shapes.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// The browser process could not be launched or connected to.
    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Navigation to a URL failed.
    #[error("navigation to {url} failed: {message}")]
    Navigation {
        /// The URL being opened.
        url: String,
        /// Failure reported by the browser.
        message: String,
    },

    /// Script evaluation failed.
    #[error("script evaluation failed: {0}")]
    Evaluate(String),

    /// Exporting the rendered page failed.
    #[error("page export failed: {0}")]
    Export(String),

    /// A DOM interaction (click, scroll) failed.
    #[error("interaction failed: {0}")]
    Interaction(String),
}
