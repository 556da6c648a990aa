//! CLI error types.

use docbind_browser::BrowserError;
use docbind_config::{ConfigError, UnknownMode};
use docbind_crawl::CrawlError;
use docbind_sites::UnknownSite;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Browser(#[from] BrowserError),

    #[error("{0}")]
    Crawl(#[from] CrawlError),

    #[error("{0}")]
    Site(#[from] UnknownSite),

    #[error("{0}")]
    Mode(#[from] UnknownMode),

    #[error("invalid index URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Validation(String),
}
