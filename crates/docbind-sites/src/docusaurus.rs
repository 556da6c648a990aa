//! Docusaurus site profile.
//!
//! The sidebar is a nested `menu__list`: link items carry their page
//! address, category items advertise children through their class list and
//! reveal a nested list when their anchor is clicked. Category anchors with
//! a `#` href are section headers without a page of their own.

use std::sync::LazyLock;
use std::time::Duration;

use docbind_browser::{DomElement, Page};
use docbind_crawl::adapter::{MenuAdapter, MenuEntry, PageCleanupHook};
use docbind_crawl::retry::{RetryPolicy, Sleeper, ThreadSleeper};
use docbind_crawl::CrawlError;
use docbind_markdown::ContentRules;
use regex::Regex;

pub(crate) const MENU_ROOT: &str = "ul.theme-doc-sidebar-menu.menu__list";
const CATEGORY_CLASS: &str = "theme-doc-sidebar-item-category";
const FOOTER: &str = "footer.theme-doc-footer";

pub(crate) const DEFAULT_OP_DELAY: Duration = Duration::from_millis(200);

static LINK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/docs/\S+$").unwrap());

/// Menu adapter for the collapsible sidebar.
pub struct DocusaurusAdapter {
    op_delay: Duration,
    sleeper: Box<dyn Sleeper>,
}

impl DocusaurusAdapter {
    pub fn new(op_delay: Duration) -> Self {
        Self {
            op_delay,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

const SCROLL_TO_BOTTOM_JS: &str =
    "window.scrollTo(0, document.documentElement.scrollHeight)";

impl MenuAdapter for DocusaurusAdapter {
    fn menu_root_selector(&self) -> &str {
        MENU_ROOT
    }

    fn entries(&self, container: &dyn DomElement) -> Vec<MenuEntry> {
        container
            .query_all(":scope > li")
            .into_iter()
            .filter_map(|item| {
                let Some(anchor) = item.query("a") else {
                    tracing::debug!("sidebar item without anchor, skipping");
                    return None;
                };
                let Some(title) = anchor.text().map(|t| t.trim().to_owned()) else {
                    tracing::debug!("sidebar item without readable title, skipping");
                    return None;
                };
                let href = anchor
                    .attribute("href")
                    .filter(|href| !href.is_empty() && href != "#");
                let expandable = item
                    .attribute("class")
                    .is_some_and(|class| class.contains(CATEGORY_CLASS));
                Some(MenuEntry {
                    title,
                    href,
                    expandable,
                    handle: item,
                })
            })
            .collect()
    }

    fn child_root(&self, entry: &MenuEntry) -> Option<Box<dyn DomElement>> {
        // Collapsed categories have no nested list at all.
        entry.handle.query("ul")
    }

    fn expand(&self, page: &dyn Page, entry: &MenuEntry) -> Result<(), CrawlError> {
        let Some(anchor) = entry.handle.query("a") else {
            tracing::debug!(title = %entry.title, "category without anchor to click");
            return Ok(());
        };
        // The sidebar virtualizes off-screen sections; scroll everything in
        // before interacting.
        page.evaluate(SCROLL_TO_BOTTOM_JS)?;
        self.sleeper.sleep(self.op_delay);
        anchor.click()?;
        self.sleeper.sleep(self.op_delay);
        Ok(())
    }
}

const TRIM_JS: &str = r"(() => {
    const assistant = document.querySelector('.petercat-lui-assistant');
    if (assistant) {
        assistant.parentNode.removeChild(assistant);
    }
    const comments = document.getElementById('comments');
    if (comments) {
        comments.parentNode.removeChild(comments);
    }
})()";

const IMAGES_COMPLETE_JS: &str = r"(() => {
    const images = document.querySelectorAll('img');
    for (let i = 0; i < images.length; i++) {
        if (!images[i].complete || images[i].naturalWidth === 0) {
            return false;
        }
    }
    return true;
})()";

/// Pre-export cleanup: strip floating widgets, pull the lazy-loaded footer
/// into view, and wait for images to finish rendering.
pub struct DocusaurusCleanup {
    image_wait: RetryPolicy,
    sleeper: Box<dyn Sleeper>,
}

impl DocusaurusCleanup {
    pub fn new() -> Self {
        Self {
            image_wait: RetryPolicy::backoff(
                Duration::from_millis(100),
                Duration::from_secs(2),
                Duration::from_secs(30),
            ),
            sleeper: Box::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

impl Default for DocusaurusCleanup {
    fn default() -> Self {
        Self::new()
    }
}

impl PageCleanupHook for DocusaurusCleanup {
    fn prepare(&self, page: &dyn Page) -> Result<(), CrawlError> {
        page.evaluate(TRIM_JS)?;
        match page.query(FOOTER) {
            Some(footer) => footer.scroll_into_view()?,
            None => tracing::debug!("page has no footer to scroll to"),
        }

        let settled = self.image_wait.run(self.sleeper.as_ref(), || {
            match page.evaluate(IMAGES_COMPLETE_JS) {
                Ok(value) if value.as_bool() == Some(true) => Some(()),
                Ok(_) => {
                    tracing::debug!("images still loading, waiting");
                    None
                }
                // An unevaluable probe will not become evaluable by waiting.
                Err(e) => {
                    tracing::debug!(error = %e, "image probe failed, giving up on the wait");
                    Some(())
                }
            }
        });
        if settled.is_none() {
            tracing::debug!("image wait budget exhausted, exporting anyway");
        }
        Ok(())
    }
}

pub(crate) fn content_rules() -> ContentRules {
    ContentRules::new("article")
        .strip("nav.theme-doc-breadcrumbs")
        .strip(".theme-doc-toc-mobile")
        .strip("nav.pagination-nav")
        .strip(".theme-edit-this-page")
}

pub(crate) fn link_pattern() -> Regex {
    LINK_PATTERN.clone()
}
