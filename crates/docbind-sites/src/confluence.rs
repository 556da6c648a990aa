//! Confluence wiki profile.
//!
//! Built against the Confluence page-tree macro: every menu level is a
//! `ul.plugin_pagetree_children_list`, each entry `li` holds a content
//! anchor, an optional expand toggle, and a child container that is filled
//! in lazily after the toggle is clicked.

use std::sync::LazyLock;
use std::time::Duration;

use docbind_browser::{DomElement, Page};
use docbind_crawl::adapter::{MenuAdapter, MenuEntry, PageCleanupHook};
use docbind_crawl::retry::{Sleeper, ThreadSleeper};
use docbind_crawl::CrawlError;
use docbind_markdown::ContentRules;
use regex::Regex;

pub(crate) const MENU_ROOT: &str =
    "ul.plugin_pagetree_children_list.plugin_pagetree_children_list_noleftspace ul";
const ENTRY_ANCHOR: &str = "div.plugin_pagetree_children_content a";
const ENTRY_TOGGLE: &str = "div.plugin_pagetree_childtoggle_container a";
const CHILD_CONTAINER: &str = "div.plugin_pagetree_children_container ul";

/// Default beat between page-tree interactions.
pub(crate) const DEFAULT_OP_DELAY: Duration = Duration::from_millis(100);

/// Internal wiki links worth rewriting in Markdown output.
static LINK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/pages/viewpage\.action\?pageId=\d+$|^/display/\S+$").unwrap()
});

/// Menu adapter for the page-tree pane.
pub struct ConfluenceAdapter {
    pre_click: Duration,
    post_click: Duration,
    sleeper: Box<dyn Sleeper>,
}

impl ConfluenceAdapter {
    /// The toggle needs settle time on both sides of the click; the tree
    /// animates and re-renders its level while expanding.
    pub fn new(op_delay: Duration) -> Self {
        Self {
            pre_click: op_delay * 3,
            post_click: op_delay * 2,
            sleeper: Box::new(ThreadSleeper),
        }
    }

    #[must_use]
    pub fn with_sleeper(mut self, sleeper: Box<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }
}

impl MenuAdapter for ConfluenceAdapter {
    fn menu_root_selector(&self) -> &str {
        MENU_ROOT
    }

    fn entries(&self, container: &dyn DomElement) -> Vec<MenuEntry> {
        container
            .query_all(":scope > li")
            .into_iter()
            .filter_map(|item| {
                let Some(anchor) = item.query(ENTRY_ANCHOR) else {
                    tracing::debug!("page-tree entry without content anchor, skipping");
                    return None;
                };
                let Some(title) = anchor.text().map(|t| t.trim().to_owned()) else {
                    tracing::debug!("page-tree entry without readable title, skipping");
                    return None;
                };
                let href = anchor
                    .attribute("href")
                    .filter(|href| !href.is_empty() && href != "#");
                let expandable = item.query(ENTRY_TOGGLE).is_some();
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
        // The container ul exists before expansion but stays empty until
        // the toggle click populates it.
        let container = entry.handle.query(CHILD_CONTAINER)?;
        container.query("li").is_some().then_some(container)
    }

    fn expand(&self, _page: &dyn Page, entry: &MenuEntry) -> Result<(), CrawlError> {
        let Some(toggle) = entry.handle.query(ENTRY_TOGGLE) else {
            tracing::debug!(title = %entry.title, "entry has no expand toggle");
            return Ok(());
        };
        self.sleeper.sleep(self.pre_click);
        toggle.click()?;
        self.sleeper.sleep(self.post_click);
        Ok(())
    }
}

const EXPORT_PREP_JS: &str = r"(() => {
    const toc = document.querySelector('div.toc-macro');
    if (toc && toc.style) {
        toc.style.maxHeight = '5000px';
    }
    document.querySelectorAll('pre').forEach((pre) => {
        pre.style.whiteSpace = 'pre-wrap';
        pre.style.wordWrap = 'break-word';
    });
    const footer = document.getElementById('footer');
    if (footer) {
        footer.parentNode.removeChild(footer);
    }
})()";

/// Pre-export cleanup: unclip the table-of-contents panel, wrap long code
/// lines, and drop the footer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfluenceCleanup;

impl PageCleanupHook for ConfluenceCleanup {
    fn prepare(&self, page: &dyn Page) -> Result<(), CrawlError> {
        page.evaluate(EXPORT_PREP_JS)?;
        Ok(())
    }
}

/// Article extraction rules for Markdown output.
pub(crate) fn content_rules() -> ContentRules {
    ContentRules::new("#main-content")
        .strip("div.page-metadata")
        .strip("div.cell.aside")
        .strip("#likes-and-labels-container")
        .strip("#comments-section")
}

pub(crate) fn link_pattern() -> Regex {
    LINK_PATTERN.clone()
}
