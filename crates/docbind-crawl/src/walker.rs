//! Depth-first navigation-tree traversal.

use std::path::{Path, PathBuf};
use std::time::Duration;

use docbind_browser::{DomElement, Page};
use docbind_pdf::Bookmark;
use url::Url;

use crate::adapter::{MenuAdapter, MenuEntry};
use crate::artifact::{ArtifactProducer, NodeContext};
use crate::retry::{RetryPolicy, Sleeper};
use crate::sanitize::sanitize_title;

/// Result of one traversal: artifacts in merge order, the mirrored
/// bookmark tree, and the page span the walk covered.
pub struct WalkOutcome {
    /// Produced artifact paths, in enumeration order. This order is the
    /// merge order and therefore the final page order.
    pub files: Vec<PathBuf>,
    /// Bookmark tree mirroring the menu, with absolute starting pages.
    pub bookmarks: Vec<Bookmark>,
    /// Total pages covered by the walk.
    pub pages: u32,
}

/// Recursively drives a [`MenuAdapter`], producing one artifact per node.
///
/// Traversal is depth-first and left-to-right; a node's own artifact comes
/// before its children's. Every per-node failure is logged and skipped so
/// one flaky page cannot abort a whole job.
pub struct TreeWalker<'w> {
    adapter: &'w dyn MenuAdapter,
    producer: &'w dyn ArtifactProducer,
    sleeper: &'w dyn Sleeper,
    base: Url,
    expand_retry: RetryPolicy,
}

impl<'w> TreeWalker<'w> {
    pub fn new(
        adapter: &'w dyn MenuAdapter,
        producer: &'w dyn ArtifactProducer,
        sleeper: &'w dyn Sleeper,
        base: Url,
    ) -> Self {
        Self {
            adapter,
            producer,
            sleeper,
            base,
            expand_retry: RetryPolicy::fixed(Duration::from_millis(100), 50),
        }
    }

    /// Override the submenu-appearance polling schedule.
    #[must_use]
    pub fn with_expand_retry(mut self, policy: RetryPolicy) -> Self {
        self.expand_retry = policy;
        self
    }

    /// Walk the whole menu under `menu_root`, numbering pages from
    /// `first_page`.
    pub fn walk(&self, page: &dyn Page, menu_root: &dyn DomElement, first_page: u32) -> WalkOutcome {
        self.walk_level(page, menu_root, Path::new(""), first_page)
    }

    fn walk_level(
        &self,
        page: &dyn Page,
        container: &dyn DomElement,
        dir: &Path,
        start: u32,
    ) -> WalkOutcome {
        let mut files = Vec::new();
        let mut bookmarks = Vec::new();
        let mut offset = start;

        for (index, entry) in self.adapter.entries(container).into_iter().enumerate() {
            let segment = format!("{index}-{}", sanitize_title(&entry.title));
            let mut bookmark = Bookmark::new(entry.title.clone(), offset);

            if let Some(href) = &entry.href {
                let url = match self.base.join(href) {
                    Ok(url) => url,
                    Err(e) => {
                        tracing::warn!(title = %entry.title, href, error = %e, "unresolvable link, skipping node");
                        continue;
                    }
                };
                let node = NodeContext {
                    url,
                    title: &entry.title,
                    dir,
                    segment: &segment,
                    index,
                    expandable: entry.expandable,
                };
                match self.producer.produce(&node) {
                    Ok(artifact) => {
                        offset += artifact.pages;
                        files.push(artifact.path);
                    }
                    Err(e) => {
                        tracing::warn!(title = %entry.title, error = %e, "artifact production failed, skipping node");
                        continue;
                    }
                }
            }

            if entry.expandable {
                if let Some(child_root) = self.expand_child(page, &entry) {
                    let child_dir = dir.join(&segment);
                    let child = self.walk_level(page, child_root.as_ref(), &child_dir, offset);
                    offset += child.pages;
                    files.extend(child.files);
                    bookmark.children = child.bookmarks;
                } else {
                    tracing::warn!(title = %entry.title, "child menu never appeared, continuing without it");
                }
            }

            bookmarks.push(bookmark);
        }

        WalkOutcome {
            files,
            bookmarks,
            pages: offset - start,
        }
    }

    /// Reveal an entry's child container.
    ///
    /// An already-present container is returned as-is without touching the
    /// expand control. Otherwise the control is triggered once and the
    /// container polled for; menus sometimes render children a beat after
    /// the toggle reacts.
    fn expand_child(&self, page: &dyn Page, entry: &MenuEntry) -> Option<Box<dyn DomElement>> {
        if let Some(existing) = self.adapter.child_root(entry) {
            return Some(existing);
        }
        if let Err(e) = self.adapter.expand(page, entry) {
            tracing::warn!(title = %entry.title, error = %e, "expand trigger failed");
            return None;
        }
        self.expand_retry
            .run(self.sleeper, || self.adapter.child_root(entry))
    }
}
