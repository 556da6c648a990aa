//! Site-agnostic crawl engine.
//!
//! The engine walks a documentation site's navigation menu depth-first
//! through a [`MenuAdapter`], renders every node to an artifact through an
//! [`ArtifactProducer`], and in PDF mode folds the artifacts into one
//! bookmarked document with the [`BatchAssembler`]. Page offsets are
//! accounted during the walk, so the bookmark tree is final the moment
//! traversal ends.
//!
//! Per-node trouble (a page that will not render, a submenu that never
//! appears, a dead link) is logged and skipped; only setup and final
//! assembly failures abort a job.

pub mod adapter;
pub mod artifact;
pub mod assemble;
mod error;
pub mod links;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod retry;
mod sanitize;
pub mod walker;

pub use adapter::{MenuAdapter, MenuEntry, NoCleanup, PageCleanupHook};
pub use artifact::{Artifact, ArtifactProducer, MarkdownProducer, NodeContext, PdfProducer};
pub use assemble::BatchAssembler;
pub use error::CrawlError;
pub use links::LinkMap;
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use sanitize::sanitize_title;
pub use walker::{TreeWalker, WalkOutcome};

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::path::Path;

    use docbind_browser::Renderer;
    use docbind_browser::mock::{MockPage, MockRenderer};
    use docbind_markdown::{ContentRules, HttpImageFetcher, ImageLocalizer, MarkdownConverter};
    use docbind_pdf::{LopdfToolkit, PdfToolkit, fixtures};
    use pretty_assertions::assert_eq;
    use regex::Regex;
    use url::Url;

    use crate::mock::{NestedListAdapter, RecordingSleeper};

    use super::*;

    const BASE: &str = "https://docs.test/";

    fn pdf_bytes(pages: u32, label: &str) -> Vec<u8> {
        let mut bytes = Vec::new();
        fixtures::sample_document(pages, label)
            .save_to(&mut bytes)
            .unwrap();
        bytes
    }

    fn pdf_page(pages: u32, label: &str) -> MockPage {
        MockPage::new("<html></html>").with_pdf(pdf_bytes(pages, label))
    }

    const COLLAPSED_MENU: &str = r##"<html><body><ul id="menu">
        <li><a href="/alpha">Alpha</a></li>
        <li class="expandable"><a href="/guide">Guide</a><span class="toggle">+</span></li>
        <li><a href="/faq">FAQ</a></li>
        </ul></body></html>"##;

    const EXPANDED_MENU: &str = r##"<html><body><ul id="menu">
        <li><a href="/alpha">Alpha</a></li>
        <li class="expandable"><a href="/guide">Guide</a><span class="toggle">-</span>
            <ul><li><a href="/guide/install">Install</a></li></ul></li>
        <li><a href="/faq">FAQ</a></li>
        </ul></body></html>"##;

    fn book_renderer() -> MockRenderer {
        MockRenderer::new()
            .with_page(BASE, MockPage::new(COLLAPSED_MENU).with_stage(EXPANDED_MENU))
            .with_page("https://docs.test/alpha", pdf_page(2, "alpha"))
            .with_page("https://docs.test/guide", pdf_page(3, "guide"))
            .with_page("https://docs.test/guide/install", pdf_page(1, "install"))
            .with_page("https://docs.test/faq", pdf_page(1, "faq"))
    }

    fn walk_book(renderer: &MockRenderer, out: &Path, toolkit: &LopdfToolkit) -> WalkOutcome {
        let adapter = NestedListAdapter;
        let producer = PdfProducer::new(renderer, toolkit, &NoCleanup, out, 15.0, false);
        let sleeper = RecordingSleeper::new();
        let walker = TreeWalker::new(
            &adapter,
            &producer,
            &sleeper,
            Url::parse(BASE).unwrap(),
        );
        let page = renderer.open(BASE).unwrap();
        let root = page.query("ul#menu").unwrap();
        walker.walk(page.as_ref(), root.as_ref(), 1)
    }

    #[test]
    fn pdf_book_is_walked_merged_and_outlined() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book");
        let renderer = book_renderer();
        let toolkit = LopdfToolkit::new();

        let outcome = walk_book(&renderer, &out, &toolkit);

        assert_eq!(
            outcome.files,
            vec![
                out.join("0-Alpha.pdf"),
                out.join("1-Guide.pdf"),
                out.join("1-Guide").join("0-Install.pdf"),
                out.join("2-FAQ.pdf"),
            ]
        );
        assert_eq!(outcome.pages, 7);
        assert_eq!(outcome.bookmarks[0].page, 1);
        assert_eq!(outcome.bookmarks[1].page, 3);
        assert_eq!(outcome.bookmarks[1].children[0].page, 6);
        assert_eq!(outcome.bookmarks[2].page, 7);
        assert_eq!(renderer.clicks(BASE), 1);

        let base_path = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 2);
        let delivered = assembler
            .assemble(&outcome.files, &outcome.bookmarks, &base_path, None)
            .unwrap();

        let book = dir.path().join("book.pdf");
        assert_eq!(delivered, vec![book.clone()]);
        assert_eq!(toolkit.page_count(&book).unwrap(), 7);

        let document = lopdf::Document::load(&book).unwrap();
        let texts = fixtures::page_texts(&document);
        assert_eq!(
            texts,
            vec![
                "alpha 1", "alpha 2", "guide 1", "guide 2", "guide 3", "install 1", "faq 1"
            ]
        );
        assert!(document.catalog().unwrap().has(b"Outlines"));
    }

    #[test]
    fn rerunning_a_finished_book_never_touches_the_browser_again() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book");
        let renderer = book_renderer();
        let toolkit = LopdfToolkit::new();

        let first = walk_book(&renderer, &out, &toolkit);
        // Menu page plus four rendered nodes.
        assert_eq!(renderer.navigation_count(), 5);

        let second = walk_book(&renderer, &out, &toolkit);
        assert_eq!(renderer.navigation_count(), 6);
        assert_eq!(renderer.clicks(BASE), 1);
        assert_eq!(second.files, first.files);
        assert_eq!(second.pages, first.pages);
    }

    #[test]
    fn oversized_book_is_delivered_in_parts() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book");
        let renderer = MockRenderer::new()
            .with_page(BASE, MockPage::new(COLLAPSED_MENU).with_stage(EXPANDED_MENU))
            .with_page("https://docs.test/alpha", pdf_page(3, "alpha"))
            .with_page("https://docs.test/guide", pdf_page(3, "guide"))
            .with_page("https://docs.test/guide/install", pdf_page(2, "install"))
            .with_page("https://docs.test/faq", pdf_page(1, "faq"));
        let toolkit = LopdfToolkit::new();

        let outcome = walk_book(&renderer, &out, &toolkit);
        assert_eq!(outcome.pages, 9);

        let base_path = dir.path().join("book");
        let assembler = BatchAssembler::new(&toolkit, 4);
        let delivered = assembler
            .assemble(&outcome.files, &outcome.bookmarks, &base_path, Some(4))
            .unwrap();

        assert_eq!(
            delivered,
            vec![
                dir.path().join("book_part1.pdf"),
                dir.path().join("book_part2.pdf"),
                dir.path().join("book_part3.pdf"),
            ]
        );
        assert!(!dir.path().join("book.pdf").exists());
        let counts: Vec<u32> = delivered
            .iter()
            .map(|part| toolkit.page_count(part).unwrap())
            .collect();
        assert_eq!(counts, vec![4, 4, 1]);
    }

    const ALPHA_ARTICLE: &str = "<html><body>\
        <main><h1>Alpha</h1><p>First page.</p></main>\
        </body></html>";
    const GUIDE_ARTICLE: &str = "<html><body>\
        <main><h1>Guide</h1><p>See <a href=\"/alpha\">Alpha</a> first.</p></main>\
        </body></html>";
    const FLAT_MENU: &str = r##"<html><body><ul id="menu">
        <li><a href="/alpha">Alpha</a></li>
        <li><a href="/guide">Guide</a></li>
        </ul></body></html>"##;

    #[test]
    fn markdown_book_is_written_with_front_matter_and_rewritten_links() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("book-md");
        let cache = dir.path().join("book-html");
        let media = dir.path().join("book-static");
        let renderer = MockRenderer::new()
            .with_page(BASE, MockPage::new(FLAT_MENU))
            .with_page("https://docs.test/alpha", MockPage::new(ALPHA_ARTICLE))
            .with_page("https://docs.test/guide", MockPage::new(GUIDE_ARTICLE));

        let adapter = NestedListAdapter;
        let converter = MarkdownConverter::new();
        let rules = ContentRules::new("main");
        let localizer = ImageLocalizer::new(HttpImageFetcher::new(), &media, "/markdown");
        let link_map = RefCell::new(LinkMap::new("/docs"));
        let producer = MarkdownProducer::new(
            &renderer, &converter, &rules, &localizer, &out, &cache, &link_map,
        );
        let sleeper = RecordingSleeper::new();
        let base = Url::parse(BASE).unwrap();
        let walker = TreeWalker::new(&adapter, &producer, &sleeper, base.clone());

        let page = renderer.open(BASE).unwrap();
        let root = page.query("ul#menu").unwrap();
        let outcome = walker.walk(page.as_ref(), root.as_ref(), 1);

        assert_eq!(
            outcome.files,
            vec![out.join("0-Alpha.md"), out.join("1-Guide.md")]
        );
        assert_eq!(outcome.pages, 0);

        let alpha = fs::read_to_string(&outcome.files[0]).unwrap();
        assert!(alpha.starts_with("---\ntitle: Alpha\nsidebar_position: 0\n---\n\n"));
        let guide = fs::read_to_string(&outcome.files[1]).unwrap();
        assert!(guide.starts_with("---\ntitle: Guide\nsidebar_position: 1\n---\n\n"));

        let map = link_map.into_inner();
        let links_file = out.join("links.json");
        map.save(&links_file).unwrap();
        assert!(links_file.exists());

        let pattern = Regex::new(r"^/[a-z/]+$").unwrap();
        let changed = map.rewrite_tree(&out, &pattern, &base).unwrap();
        assert_eq!(changed, 1);
        let guide = fs::read_to_string(&outcome.files[1]).unwrap();
        assert!(guide.contains("](/docs/Alpha)"));
    }
}
