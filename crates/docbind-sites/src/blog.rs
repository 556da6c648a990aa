//! Flat blog archive profile.
//!
//! The index page lists every article up front in a column of plain lists,
//! one per year. There is nothing to expand; the whole book is the index
//! order, top to bottom. Article links are absolute URLs.

use std::sync::LazyLock;
use std::time::Duration;

use docbind_browser::{DomElement, Page};
use docbind_crawl::adapter::{MenuAdapter, MenuEntry, PageCleanupHook};
use docbind_crawl::retry::{Sleeper, ThreadSleeper};
use docbind_crawl::CrawlError;
use docbind_markdown::ContentRules;
use regex::Regex;

pub(crate) const MENU_ROOT: &str = "div#alpha-inner";

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/blog/\S+\.html$").unwrap());

/// Menu adapter for the archive column.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlogAdapter;

impl MenuAdapter for BlogAdapter {
    fn menu_root_selector(&self) -> &str {
        MENU_ROOT
    }

    fn entries(&self, container: &dyn DomElement) -> Vec<MenuEntry> {
        container
            .query_all("ul")
            .iter()
            .flat_map(|list| list.query_all("li"))
            .filter_map(|item| {
                let Some(anchor) = item.query("a") else {
                    tracing::debug!("archive item without anchor, skipping");
                    return None;
                };
                let Some(title) = anchor.text().map(|t| t.trim().to_owned()) else {
                    tracing::debug!("archive item without readable title, skipping");
                    return None;
                };
                let href = anchor.attribute("href").filter(|href| !href.is_empty());
                Some(MenuEntry {
                    title,
                    href,
                    expandable: false,
                    handle: item,
                })
            })
            .collect()
    }

    fn child_root(&self, _entry: &MenuEntry) -> Option<Box<dyn DomElement>> {
        None
    }

    fn expand(&self, _page: &dyn Page, _entry: &MenuEntry) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Article pages carry no scripts worth running; a short settle pause is
/// enough for fonts and images.
pub struct BlogCleanup {
    settle: Duration,
    sleeper: Box<dyn Sleeper>,
}

impl BlogCleanup {
    pub fn new() -> Self {
        Self {
            settle: Duration::from_secs(1),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

impl Default for BlogCleanup {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCleanupHook for BlogCleanup {
    fn prepare(&self, _page: &dyn Page) -> Result<(), CrawlError> {
        self.sleeper.sleep(self.settle);
        Ok(())
    }
}

pub(crate) fn content_rules() -> ContentRules {
    ContentRules::new("article").strip("#comments")
}

pub(crate) fn link_pattern() -> Regex {
    LINK_PATTERN.clone()
}
