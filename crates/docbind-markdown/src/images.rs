//! Image localization.
//!
//! Site-relative images would dangle once the article leaves the site, so
//! they are downloaded next to the Markdown output and the HTML is pointed
//! at the local copies before conversion. Absolute and data URLs are left
//! alone.

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use scraper::{Html, Selector};
use sha2::{Digest, Sha256};
use ureq::Agent;
use url::Url;

use crate::MarkdownError;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Downloads image bytes from a URL.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MarkdownError>;
}

/// [`ImageFetcher`] over a plain HTTP client.
pub struct HttpImageFetcher {
    agent: Agent,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        let agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT)))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageFetcher for HttpImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, MarkdownError> {
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| MarkdownError::Http {
                url: url.to_owned(),
                status: 0,
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        let mut body = response.into_body();

        if status >= 400 {
            let message = body
                .read_to_string()
                .unwrap_or_else(|_| "(unable to read error body)".to_string());
            return Err(MarkdownError::Http {
                url: url.to_owned(),
                status,
                message,
            });
        }

        body.read_to_vec().map_err(|e| MarkdownError::Http {
            url: url.to_owned(),
            status,
            message: e.to_string(),
        })
    }
}

/// Rewrites site-relative image references to locally stored copies.
pub struct ImageLocalizer<F> {
    fetcher: F,
    media_dir: PathBuf,
    public_prefix: String,
}

impl<F: ImageFetcher> ImageLocalizer<F> {
    /// Localizer storing files under `media_dir` and referencing them as
    /// `{public_prefix}/{name}` from the rewritten HTML.
    pub fn new(fetcher: F, media_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            fetcher,
            media_dir: media_dir.into(),
            public_prefix: public_prefix.into(),
        }
    }

    /// Download every site-relative `img` source in `html`, resolved
    /// against `page_url`, and return the HTML with sources rewritten.
    ///
    /// A failed download keeps the original reference and the page still
    /// converts; only filesystem failures abort.
    pub fn localize(&self, html: &str, page_url: &Url) -> Result<String, MarkdownError> {
        let img = Selector::parse("img").map_err(|_| MarkdownError::Selector("img".to_owned()))?;
        let dom = Html::parse_document(html);

        let mut replacements: Vec<(String, String)> = Vec::new();
        let mut seen = HashSet::new();
        for element in dom.select(&img) {
            let Some(src) = element.value().attr("src") else {
                continue;
            };
            if src.is_empty()
                || src.starts_with("http://")
                || src.starts_with("https://")
                || src.starts_with("data:")
            {
                continue;
            }
            if !seen.insert(src.to_owned()) {
                continue;
            }
            let resolved = match page_url.join(src) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::debug!(src, error = %e, "unresolvable image source");
                    continue;
                }
            };
            let bytes = match self.fetcher.fetch(resolved.as_str()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(url = %resolved, error = %e, "image fetch failed, keeping remote reference");
                    continue;
                }
            };
            let name = media_name(&resolved, &bytes);
            let target = self.media_dir.join(&name);
            if !target.exists() {
                fs::create_dir_all(&self.media_dir)?;
                fs::write(&target, &bytes)?;
            }
            let public = format!("{}/{name}", self.public_prefix.trim_end_matches('/'));
            tracing::debug!(src, %public, "localized image");
            replacements.push((src.to_owned(), public));
        }

        Ok(apply_replacements(html, &replacements))
    }
}

/// Replace quoted attribute values equal to each old source. Serialized
/// DOMs entity-escape ampersands, so the escaped spelling is replaced as
/// well.
fn apply_replacements(html: &str, replacements: &[(String, String)]) -> String {
    let mut out = html.to_owned();
    for (old, new) in replacements {
        out = out.replace(&format!("\"{old}\""), &format!("\"{new}\""));
        let escaped = old.replace('&', "&amp;");
        if escaped != *old {
            out = out.replace(&format!("\"{escaped}\""), &format!("\"{new}\""));
        }
    }
    out
}

/// Content-hashed file name, keeping the source extension when it has one.
fn media_name(url: &Url, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hex::encode(hasher.finalize());
    match extension(url) {
        Some(ext) => format!("{}.{ext}", &digest[..16]),
        None => digest[..16].to_owned(),
    }
}

fn extension(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    let (_, ext) = segment.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then(|| ext.to_ascii_lowercase())
}
