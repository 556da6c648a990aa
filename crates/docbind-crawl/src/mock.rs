//! Recording doubles for the crawl engine's seams.
//!
//! [`RecordingSleeper`] captures polling schedules, [`FakeToolkit`] records
//! PDF operations against an in-memory page-count table, and
//! [`NestedListAdapter`] reads plain nested `<ul>`/`<li>` menus so engine
//! tests can drive a whole crawl against the browser mock without a real
//! site profile.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use docbind_browser::{DomElement, Page};
use docbind_pdf::{Bookmark, PdfError, PdfToolkit};

use crate::CrawlError;
use crate::adapter::{MenuAdapter, MenuEntry};
use crate::retry::Sleeper;

/// [`Sleeper`] that records requested durations instead of waiting.
///
/// Clones share the same record, so a test can hand one off behind a
/// `Box<dyn Sleeper>` and still read the schedule afterwards.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Rc<RefCell<Vec<Duration>>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All requested sleeps, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.borrow().clone()
    }

    /// Sum of all requested sleeps.
    pub fn total(&self) -> Duration {
        self.sleeps.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.sleeps.borrow_mut().push(duration);
    }
}

/// [`PdfToolkit`] double backed by a page-count table.
///
/// Merges assign the output the sum of its inputs' counts and write the
/// count into a marker file, so batch chains keep consistent totals without
/// real documents and counts survive file renames. Splits emit the same
/// `{stem}_{from}-{to}.pdf` names as the real toolkit.
#[derive(Debug, Default)]
pub struct FakeToolkit {
    counts: RefCell<HashMap<PathBuf, u32>>,
    uncountable: RefCell<Vec<PathBuf>>,
    merges: RefCell<Vec<(Vec<PathBuf>, PathBuf)>>,
    attaches: RefCell<Vec<(PathBuf, PathBuf, Vec<Bookmark>)>>,
    splits: RefCell<Vec<(PathBuf, Vec<u32>)>>,
}

impl FakeToolkit {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the page count of an input file.
    #[must_use]
    pub fn with_count(self, path: impl Into<PathBuf>, pages: u32) -> Self {
        self.counts.borrow_mut().insert(path.into(), pages);
        self
    }

    /// Make [`PdfToolkit::page_count`] fail for `path`.
    #[must_use]
    pub fn failing_count(self, path: impl Into<PathBuf>) -> Self {
        self.uncountable.borrow_mut().push(path.into());
        self
    }

    pub fn merges(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.merges.borrow().clone()
    }

    pub fn attaches(&self) -> Vec<(PathBuf, PathBuf, Vec<Bookmark>)> {
        self.attaches.borrow().clone()
    }

    pub fn splits(&self) -> Vec<(PathBuf, Vec<u32>)> {
        self.splits.borrow().clone()
    }
}

impl PdfToolkit for FakeToolkit {
    fn page_count(&self, path: &Path) -> Result<u32, PdfError> {
        if self.uncountable.borrow().iter().any(|p| p == path) {
            return Err(PdfError::NoPages(path.to_path_buf()));
        }
        if let Some(count) = self.counts.borrow().get(path) {
            return Ok(*count);
        }
        // Marker files carry their count, so renamed outputs stay countable.
        fs::read_to_string(path)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .ok_or_else(|| PdfError::NoPages(path.to_path_buf()))
    }

    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), PdfError> {
        if inputs.is_empty() {
            return Err(PdfError::NoInput);
        }
        let total: u32 = {
            let counts = self.counts.borrow();
            inputs
                .iter()
                .map(|input| counts.get(input).copied().unwrap_or(0))
                .sum()
        };
        fs::write(output, total.to_string())?;
        self.counts.borrow_mut().insert(output.to_path_buf(), total);
        self.merges
            .borrow_mut()
            .push((inputs.to_vec(), output.to_path_buf()));
        Ok(())
    }

    fn attach_bookmarks(
        &self,
        input: &Path,
        output: &Path,
        bookmarks: &[Bookmark],
    ) -> Result<(), PdfError> {
        let pages = self.counts.borrow().get(input).copied().unwrap_or(0);
        fs::write(output, pages.to_string())?;
        self.counts.borrow_mut().insert(output.to_path_buf(), pages);
        self.attaches.borrow_mut().push((
            input.to_path_buf(),
            output.to_path_buf(),
            bookmarks.to_vec(),
        ));
        Ok(())
    }

    fn split_at(
        &self,
        input: &Path,
        output_dir: &Path,
        starts: &[u32],
    ) -> Result<Vec<PathBuf>, PdfError> {
        let total = self.page_count(input)?;
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.splits
            .borrow_mut()
            .push((input.to_path_buf(), starts.to_vec()));

        let mut parts = Vec::with_capacity(starts.len());
        for (i, from) in starts.iter().enumerate() {
            let to = starts.get(i + 1).map_or(total, |next| next - 1);
            let part = output_dir.join(format!("{stem}_{from}-{to}.pdf"));
            let pages = to - from + 1;
            fs::write(&part, pages.to_string())?;
            self.counts.borrow_mut().insert(part.clone(), pages);
            parts.push(part);
        }
        Ok(parts)
    }
}

/// Menu adapter over plain nested lists.
///
/// Reads `li` entries of a `ul` container: the entry's own `a` carries
/// title and link ("#" or an empty href marks a placeholder), an
/// `expandable` class advertises children, a child `ul` is the child
/// container, and a `.toggle` element inside the entry reveals it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NestedListAdapter;

impl MenuAdapter for NestedListAdapter {
    fn menu_root_selector(&self) -> &str {
        "#menu"
    }

    fn entries(&self, container: &dyn DomElement) -> Vec<MenuEntry> {
        container
            .query_all(":scope > li")
            .into_iter()
            .filter_map(|item| {
                let Some(anchor) = item.query(":scope > a") else {
                    tracing::debug!("menu item without anchor, skipping");
                    return None;
                };
                let title = anchor.text().map(|t| t.trim().to_owned())?;
                if title.is_empty() {
                    tracing::debug!("menu item without title, skipping");
                    return None;
                }
                let href = anchor
                    .attribute("href")
                    .filter(|href| !href.is_empty() && href != "#");
                let expandable = item
                    .attribute("class")
                    .is_some_and(|c| c.split_whitespace().any(|class| class == "expandable"));
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
        entry.handle.query(":scope > ul")
    }

    fn expand(&self, _page: &dyn Page, entry: &MenuEntry) -> Result<(), CrawlError> {
        if let Some(toggle) = entry.handle.query(".toggle") {
            toggle.click()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use docbind_browser::Renderer;
    use docbind_browser::mock::{MockPage, MockRenderer};
    use pretty_assertions::assert_eq;

    use super::*;

    const MENU: &str = r##"<html><body><ul id="menu">
        <li><a href="/alpha">Alpha</a></li>
        <li><a href="#">Sections</a></li>
        <li><span>no anchor here</span></li>
        <li class="expandable"><a href="/guide">Guide</a><ul><li><a href="/guide/install">Install</a></li></ul></li>
        </ul></body></html>"##;

    #[test]
    fn nested_list_adapter_reads_titles_links_and_placeholders() {
        let renderer =
            MockRenderer::new().with_page("https://site.test/", MockPage::new(MENU));
        let page = renderer.open("https://site.test/").unwrap();
        let root = page.query("ul#menu").unwrap();

        let adapter = NestedListAdapter;
        let entries = adapter.entries(root.as_ref());

        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Sections", "Guide"]);
        assert_eq!(entries[0].href.as_deref(), Some("/alpha"));
        assert_eq!(entries[1].href, None);
        assert!(!entries[1].expandable);
        assert!(entries[2].expandable);
        let child = adapter.child_root(&entries[2]).unwrap();
        assert_eq!(adapter.entries(child.as_ref())[0].title, "Install");
        assert!(adapter.child_root(&entries[0]).is_none());
    }

    #[test]
    fn fake_toolkit_sums_merge_counts_and_names_split_parts() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.pdf");
        let b = dir.path().join("b.pdf");
        let merged = dir.path().join("book.pdf");
        let toolkit = FakeToolkit::new().with_count(&a, 2).with_count(&b, 3);

        toolkit.merge(&[a, b], &merged).unwrap();
        assert_eq!(toolkit.page_count(&merged).unwrap(), 5);

        let parts = toolkit.split_at(&merged, dir.path(), &[1, 4]).unwrap();
        assert_eq!(
            parts,
            vec![dir.path().join("book_1-3.pdf"), dir.path().join("book_4-5.pdf")]
        );
        assert_eq!(toolkit.page_count(&parts[1]).unwrap(), 2);
    }
}
