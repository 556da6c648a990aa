//! Cross-link rewriting for Markdown output.
//!
//! While Markdown artifacts are produced, the map records where each
//! source page URL ended up in the output tree. A post-pass then walks the
//! finished tree and rewrites in-site links: mapped URLs become relative
//! document paths, unmapped ones are absolutized against the site base so
//! they at least stay reachable. The map is scoped to one job and persisted
//! next to the output so re-runs extend it.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::CrawlError;

/// Markdown inline link targets.
static LINK_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\]\(([^()\s]+)\)").unwrap());

/// Leading sibling-index prefix on a path segment.
static INDEX_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+-").unwrap());

/// Job-scoped map from source page URLs to output document paths.
pub struct LinkMap {
    docs_base: String,
    entries: BTreeMap<String, String>,
}

impl LinkMap {
    /// Empty map publishing documents under `docs_base` (such as `/docs`).
    pub fn new(docs_base: impl Into<String>) -> Self {
        Self {
            docs_base: docs_base.into().trim_end_matches('/').to_owned(),
            entries: BTreeMap::new(),
        }
    }

    /// Load previously recorded entries, keeping them when the file is
    /// absent.
    pub fn load(docs_base: impl Into<String>, path: &Path) -> Result<Self, CrawlError> {
        let mut map = Self::new(docs_base);
        if path.exists() {
            let raw = fs::read_to_string(path)?;
            map.entries = serde_json::from_str(&raw)?;
        }
        Ok(map)
    }

    /// Persist the entries as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), CrawlError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }

    /// Record that `url` was rendered to `relative`, a path under the
    /// Markdown output root.
    pub fn record(&mut self, url: &Url, relative: &Path) {
        let key = link_key(url);
        let value = self.docs_path(relative);
        tracing::debug!(key, value, "recorded link mapping");
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite the inline link targets of one document.
    ///
    /// Only targets on the site itself that match `pattern` are touched:
    /// mapped ones become document paths, the rest become absolute URLs
    /// against `base`.
    pub fn rewrite(&self, markdown: &str, pattern: &Regex, base: &Url) -> String {
        LINK_TARGET
            .replace_all(markdown, |caps: &regex::Captures<'_>| {
                match self.rewrite_target(&caps[1], pattern, base) {
                    Some(target) => format!("]({target})"),
                    None => caps[0].to_owned(),
                }
            })
            .into_owned()
    }

    /// Rewrite every `.md` file under `dir`, returning how many changed.
    pub fn rewrite_tree(
        &self,
        dir: &Path,
        pattern: &Regex,
        base: &Url,
    ) -> Result<usize, CrawlError> {
        let mut changed = 0;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                changed += self.rewrite_tree(&path, pattern, base)?;
            } else if path.extension().is_some_and(|ext| ext == "md") {
                let original = fs::read_to_string(&path)?;
                let rewritten = self.rewrite(&original, pattern, base);
                if rewritten != original {
                    fs::write(&path, rewritten)?;
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    fn rewrite_target(&self, target: &str, pattern: &Regex, base: &Url) -> Option<String> {
        let resolved = base.join(target).ok()?;
        if resolved.host_str() != base.host_str() || resolved.port_or_known_default() != base.port_or_known_default() {
            return None;
        }
        let key = link_key(&resolved);
        if !pattern.is_match(&key) {
            return None;
        }
        match self.entries.get(&key) {
            Some(mapped) => Some(mapped.clone()),
            None => Some(resolved.into()),
        }
    }

    /// Published path for an output-relative file: index prefixes are
    /// stripped from every segment and the `.md` suffix is dropped.
    fn docs_path(&self, relative: &Path) -> String {
        let mut out = self.docs_base.clone();
        for component in relative.components() {
            if let Component::Normal(segment) = component {
                let segment = segment.to_string_lossy();
                out.push('/');
                out.push_str(&INDEX_PREFIX.replace(&segment, ""));
            }
        }
        out.trim_end_matches(".md").to_owned()
    }
}

/// Host-independent lookup key: percent-encoded path plus the query with
/// navigation-state parameters dropped.
fn link_key(url: &Url) -> String {
    let mut key = url.path().to_owned();
    if let Some(query) = url.query() {
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| !pair.starts_with("src="))
            .collect();
        if !kept.is_empty() {
            key.push('?');
            key.push_str(&kept.join("&"));
        }
    }
    key
}
