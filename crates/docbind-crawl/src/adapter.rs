//! The per-site menu contract.

use docbind_browser::{DomElement, Page};

use crate::CrawlError;

/// One entry of a navigation menu level.
///
/// Entries live only for the duration of one traversal level; the handle
/// points back into the live page for expansion.
pub struct MenuEntry {
    /// Display title, unsanitized.
    pub title: String,
    /// Absolute or site-relative link target. `None` marks a placeholder
    /// entry (a section header without a page of its own) that gets a
    /// bookmark but no artifact.
    pub href: Option<String>,
    /// Whether the entry advertises children.
    pub expandable: bool,
    /// Handle to the entry's list element.
    pub handle: Box<dyn DomElement>,
}

/// Translates one site's navigation DOM into the generic traversal
/// contract.
///
/// Enumeration order must match on-screen order; it becomes the artifact,
/// merge, and bookmark order. Expansion is split into a trigger and a
/// probe so the walker can poll for the child container without clicking
/// the toggle twice: [`MenuAdapter::child_root`] never mutates the page,
/// and once a container is present it keeps returning that same container,
/// so re-expanding an expanded entry is a no-op.
pub trait MenuAdapter {
    /// Selector locating the menu root on the index page.
    fn menu_root_selector(&self) -> &str;

    /// Entries of one menu level, in on-screen order.
    ///
    /// Entries missing an anchor or a readable title are skipped here and
    /// logged; a flaky sibling must not abort the level.
    fn entries(&self, container: &dyn DomElement) -> Vec<MenuEntry>;

    /// The entry's child container, if it is present in the DOM right now.
    fn child_root(&self, entry: &MenuEntry) -> Option<Box<dyn DomElement>>;

    /// Trigger the entry's expand control once, applying the site's
    /// operation delays. The child container may appear only after a
    /// further wait; callers poll [`MenuAdapter::child_root`] for it.
    fn expand(&self, page: &dyn Page, entry: &MenuEntry) -> Result<(), CrawlError>;
}

/// DOM preparation applied to a page before PDF export, such as widening
/// scroll panels, unwrapping code blocks, or stripping footers.
pub trait PageCleanupHook {
    fn prepare(&self, page: &dyn Page) -> Result<(), CrawlError>;
}

/// Cleanup hook that leaves the page untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCleanup;

impl PageCleanupHook for NoCleanup {
    fn prepare(&self, _page: &dyn Page) -> Result<(), CrawlError> {
        Ok(())
    }
}
