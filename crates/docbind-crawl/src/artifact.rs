//! Per-node artifact production.
//!
//! The walker hands every menu node to an [`ArtifactProducer`]; the two
//! implementations here render it either to a standalone PDF or to a
//! Markdown file plus its localized images. Both skip work for paths that
//! already exist, so an interrupted job can be re-run and only fills the
//! gaps.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use docbind_browser::{Page, PdfExportOptions, Renderer};
use docbind_markdown::{
    ContentRules, ImageFetcher, ImageLocalizer, MarkdownConverter, extract_content,
    with_front_matter,
};
use docbind_pdf::PdfToolkit;
use url::Url;

use crate::CrawlError;
use crate::adapter::PageCleanupHook;
use crate::links::LinkMap;

/// Paper height, in inches, of one sheet of the paginated probe export.
const PAGE_HEIGHT_IN: f64 = 11.0;

/// One produced artifact: where it landed and how many pages it spans.
/// Markdown artifacts report zero pages.
pub struct Artifact {
    pub path: PathBuf,
    pub pages: u32,
}

/// Everything a producer needs to know about one menu node.
pub struct NodeContext<'n> {
    /// Resolved absolute page address.
    pub url: Url,
    /// Display title, unsanitized.
    pub title: &'n str,
    /// Output directory of the node's menu level, relative to the job root.
    pub dir: &'n Path,
    /// Order-prefixed sanitized file stem, unique within `dir`.
    pub segment: &'n str,
    /// Zero-based position among siblings.
    pub index: usize,
    /// Whether the node has (or advertises) children.
    pub expandable: bool,
}

/// Renders one menu node into an artifact on disk.
pub trait ArtifactProducer {
    fn produce(&self, node: &NodeContext<'_>) -> Result<Artifact, CrawlError>;
}

/// Produces one PDF per node via the browser's print pipeline.
///
/// Export runs twice: a first pass at fixed paper width paginates normally
/// and yields a page count, then a second pass sized to that count renders
/// the whole page onto one tall sheet, which keeps merged documents free
/// of mid-content page breaks. If the second pass cannot be measured or
/// rendered, the paginated copy stands.
pub struct PdfProducer<'p> {
    renderer: &'p dyn Renderer,
    toolkit: &'p dyn PdfToolkit,
    cleanup: &'p dyn PageCleanupHook,
    out_dir: PathBuf,
    paper_width: f64,
    print_background: bool,
}

impl<'p> PdfProducer<'p> {
    pub fn new(
        renderer: &'p dyn Renderer,
        toolkit: &'p dyn PdfToolkit,
        cleanup: &'p dyn PageCleanupHook,
        out_dir: impl Into<PathBuf>,
        paper_width: f64,
        print_background: bool,
    ) -> Self {
        Self {
            renderer,
            toolkit,
            cleanup,
            out_dir: out_dir.into(),
            paper_width,
            print_background,
        }
    }

    fn render(&self, page: &dyn Page, path: &Path) -> Result<(), CrawlError> {
        page.wait_stable()?;
        if let Err(e) = self.cleanup.prepare(page) {
            tracing::warn!(error = %e, "page cleanup failed, exporting as-is");
        }
        let paginated = page.export_pdf(&PdfExportOptions {
            paper_width: Some(self.paper_width),
            paper_height: None,
            print_background: self.print_background,
        })?;
        fs::write(path, &paginated)?;
        match self.toolkit.page_count(path) {
            Ok(sheets) => {
                let fitted = PdfExportOptions {
                    paper_width: Some(self.paper_width),
                    paper_height: Some(PAGE_HEIGHT_IN * f64::from(sheets)),
                    print_background: self.print_background,
                };
                match page.export_pdf(&fitted) {
                    Ok(bytes) => fs::write(path, &bytes)?,
                    Err(e) => {
                        tracing::debug!(error = %e, "single-sheet re-export failed, keeping paginated copy");
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "paginated export not measurable, keeping it");
            }
        }
        Ok(())
    }
}

impl ArtifactProducer for PdfProducer<'_> {
    fn produce(&self, node: &NodeContext<'_>) -> Result<Artifact, CrawlError> {
        let path = self.out_dir.join(node.dir).join(format!("{}.pdf", node.segment));
        if path.exists() {
            let pages = self.toolkit.page_count(&path)?;
            tracing::debug!(path = %path.display(), pages, "artifact already present, skipping render");
            return Ok(Artifact { path, pages });
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        tracing::info!(url = %node.url, path = %path.display(), "rendering page to pdf");
        let page = self.renderer.open(node.url.as_str())?;
        let rendered = self.render(page.as_ref(), &path);
        page.close();
        rendered?;

        let pages = self.toolkit.page_count(&path)?;
        Ok(Artifact { path, pages })
    }
}

/// Produces one Markdown file per node, mirroring the menu as a directory
/// tree.
///
/// Expandable nodes become `dir/segment/segment.md` so their children can
/// nest alongside; leaves become `dir/segment.md`. The extracted article
/// HTML is cached next to the output tree, so re-runs and converter changes
/// skip the browser entirely. Every node is recorded in the [`LinkMap`]
/// before any skip-if-present check runs, keeping cross-link rewriting
/// complete even on partial re-runs.
pub struct MarkdownProducer<'p, F> {
    renderer: &'p dyn Renderer,
    converter: &'p MarkdownConverter,
    rules: &'p ContentRules,
    localizer: &'p ImageLocalizer<F>,
    out_dir: PathBuf,
    cache_dir: PathBuf,
    link_map: &'p RefCell<LinkMap>,
}

impl<'p, F: ImageFetcher> MarkdownProducer<'p, F> {
    pub fn new(
        renderer: &'p dyn Renderer,
        converter: &'p MarkdownConverter,
        rules: &'p ContentRules,
        localizer: &'p ImageLocalizer<F>,
        out_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        link_map: &'p RefCell<LinkMap>,
    ) -> Self {
        Self {
            renderer,
            converter,
            rules,
            localizer,
            out_dir: out_dir.into(),
            cache_dir: cache_dir.into(),
            link_map,
        }
    }

    /// Article HTML for the node, from the cache when present.
    ///
    /// Cache files hold the extracted article fragment with chrome already
    /// stripped, so a cache hit skips the browser and the extraction pass.
    fn content_html(&self, node: &NodeContext<'_>) -> Result<String, CrawlError> {
        let cache_path = self
            .cache_dir
            .join(node.dir)
            .join(format!("{}.html", node.segment));
        if cache_path.exists() {
            tracing::debug!(path = %cache_path.display(), "serving article html from cache");
            return Ok(fs::read_to_string(&cache_path)?);
        }

        let page = self.renderer.open(node.url.as_str())?;
        let exported = Self::export(page.as_ref());
        page.close();
        let content = extract_content(&exported?, self.rules)?;

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cache_path, &content)?;
        Ok(content)
    }

    fn export(page: &dyn Page) -> Result<String, CrawlError> {
        page.wait_stable()?;
        Ok(page.export_html()?)
    }
}

impl<F: ImageFetcher> ArtifactProducer for MarkdownProducer<'_, F> {
    fn produce(&self, node: &NodeContext<'_>) -> Result<Artifact, CrawlError> {
        let relative = if node.expandable {
            node.dir
                .join(node.segment)
                .join(format!("{}.md", node.segment))
        } else {
            node.dir.join(format!("{}.md", node.segment))
        };
        self.link_map.borrow_mut().record(&node.url, &relative);

        let path = self.out_dir.join(&relative);
        if path.exists() {
            tracing::debug!(path = %path.display(), "markdown already present, skipping");
            return Ok(Artifact { path, pages: 0 });
        }

        tracing::info!(url = %node.url, path = %path.display(), "rendering page to markdown");
        let content = self.content_html(node)?;
        let localized = self.localizer.localize(&content, &node.url)?;
        let markdown = self.converter.to_markdown(&localized)?;
        let markdown = with_front_matter(&markdown, node.title, Some(node.index));

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, markdown)?;
        Ok(Artifact { path, pages: 0 })
    }
}

#[cfg(test)]
mod tests {
    use docbind_browser::mock::{MockPage, MockRenderer};
    use docbind_markdown::HttpImageFetcher;
    use docbind_pdf::{LopdfToolkit, fixtures};
    use pretty_assertions::assert_eq;

    use crate::adapter::NoCleanup;

    use super::*;

    fn leaf<'n>(url: &str, title: &'n str, segment: &'n str) -> NodeContext<'n> {
        NodeContext {
            url: Url::parse(url).unwrap(),
            title,
            dir: Path::new(""),
            segment,
            index: 0,
            expandable: false,
        }
    }

    fn sample_bytes(pages: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        fixtures::sample_document(pages, "node")
            .save_to(&mut bytes)
            .unwrap();
        bytes
    }

    #[test]
    fn pdf_export_runs_twice_with_measured_height() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://site.test/a";
        let renderer = MockRenderer::new()
            .with_page(url, MockPage::new("<html></html>").with_pdf(sample_bytes(3)));
        let toolkit = LopdfToolkit::new();
        let producer = PdfProducer::new(&renderer, &toolkit, &NoCleanup, dir.path(), 15.0, true);

        let artifact = producer.produce(&leaf(url, "Alpha", "0-Alpha")).unwrap();

        assert_eq!(artifact.path, dir.path().join("0-Alpha.pdf"));
        assert_eq!(artifact.pages, 3);
        let exports = renderer.pdf_exports(url);
        assert_eq!(exports.len(), 2);
        assert_eq!(exports[0].paper_width, Some(15.0));
        assert_eq!(exports[0].paper_height, None);
        assert!(exports[0].print_background);
        assert_eq!(exports[1].paper_height, Some(33.0));
        assert_eq!(renderer.closes(url), 1);
    }

    #[test]
    fn existing_pdf_is_reused_without_touching_the_browser() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("0-Alpha.pdf");
        fixtures::write_sample(&existing, 4, "kept").unwrap();
        let renderer = MockRenderer::new();
        let toolkit = LopdfToolkit::new();
        let producer = PdfProducer::new(&renderer, &toolkit, &NoCleanup, dir.path(), 15.0, false);

        let artifact = producer
            .produce(&leaf("https://site.test/a", "Alpha", "0-Alpha"))
            .unwrap();

        assert_eq!(artifact.pages, 4);
        assert_eq!(renderer.navigation_count(), 0);
    }

    #[test]
    fn pdf_export_failure_still_closes_the_tab() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://site.test/a";
        let renderer = MockRenderer::new().with_page(url, MockPage::new("<html></html>"));
        let toolkit = LopdfToolkit::new();
        let producer = PdfProducer::new(&renderer, &toolkit, &NoCleanup, dir.path(), 15.0, true);

        let result = producer.produce(&leaf(url, "Alpha", "0-Alpha"));

        assert!(result.is_err());
        assert_eq!(renderer.closes(url), 1);
    }

    const ARTICLE: &str = "<html><body>\
        <main><h1>Install Guide</h1><p>Step one.</p></main>\
        <footer>site footer</footer>\
        </body></html>";

    struct MarkdownFixture {
        converter: MarkdownConverter,
        rules: ContentRules,
        localizer: ImageLocalizer<HttpImageFetcher>,
        link_map: RefCell<LinkMap>,
    }

    impl MarkdownFixture {
        fn new(media_dir: &Path) -> Self {
            Self {
                converter: MarkdownConverter::new(),
                rules: ContentRules::new("main"),
                localizer: ImageLocalizer::new(HttpImageFetcher::new(), media_dir, "/markdown"),
                link_map: RefCell::new(LinkMap::new("/docs")),
            }
        }

        fn producer<'p>(
            &'p self,
            renderer: &'p MockRenderer,
            out: &Path,
            cache: &Path,
        ) -> MarkdownProducer<'p, HttpImageFetcher> {
            MarkdownProducer::new(
                renderer,
                &self.converter,
                &self.rules,
                &self.localizer,
                out,
                cache,
                &self.link_map,
            )
        }
    }

    #[test]
    fn markdown_leaf_gets_front_matter_and_cached_html() {
        let dir = tempfile::tempdir().unwrap();
        let (out, cache, media) = (
            dir.path().join("book-md"),
            dir.path().join("book-html"),
            dir.path().join("book-static"),
        );
        let url = "https://site.test/install";
        let renderer = MockRenderer::new().with_page(url, MockPage::new(ARTICLE));
        let fixture = MarkdownFixture::new(&media);
        let producer = fixture.producer(&renderer, &out, &cache);

        let node = leaf(url, "Install Guide", "0-Install Guide");
        let artifact = producer.produce(&node).unwrap();

        assert_eq!(artifact.path, out.join("0-Install Guide.md"));
        assert_eq!(artifact.pages, 0);
        let written = fs::read_to_string(&artifact.path).unwrap();
        assert!(written.starts_with("---\ntitle: Install Guide\nsidebar_position: 0\n---\n\n"));
        assert!(written.contains("# Install Guide"));
        assert!(written.contains("Step one."));
        assert!(!written.contains("site footer"));

        let cached = fs::read_to_string(cache.join("0-Install Guide.html")).unwrap();
        assert!(cached.contains("<h1>Install Guide</h1>"));
        assert!(!cached.contains("site footer"));
    }

    #[test]
    fn markdown_rerun_serves_from_cache_and_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let (out, cache, media) = (
            dir.path().join("book-md"),
            dir.path().join("book-html"),
            dir.path().join("book-static"),
        );
        let url = "https://site.test/install";
        let renderer = MockRenderer::new().with_page(url, MockPage::new(ARTICLE));
        let fixture = MarkdownFixture::new(&media);
        let producer = fixture.producer(&renderer, &out, &cache);
        let node = leaf(url, "Install Guide", "0-Install Guide");

        producer.produce(&node).unwrap();
        assert_eq!(renderer.navigation_count(), 1);

        // Present output short-circuits entirely.
        producer.produce(&node).unwrap();
        assert_eq!(renderer.navigation_count(), 1);
        assert_eq!(fixture.link_map.borrow().len(), 1);

        // With the output gone but the cache kept, the browser stays idle.
        fs::remove_file(out.join("0-Install Guide.md")).unwrap();
        producer.produce(&node).unwrap();
        assert_eq!(renderer.navigation_count(), 1);
    }

    #[test]
    fn expandable_markdown_node_nests_inside_its_own_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (out, cache, media) = (
            dir.path().join("book-md"),
            dir.path().join("book-html"),
            dir.path().join("book-static"),
        );
        let url = "https://site.test/guide";
        let renderer = MockRenderer::new().with_page(url, MockPage::new(ARTICLE));
        let fixture = MarkdownFixture::new(&media);
        let producer = fixture.producer(&renderer, &out, &cache);

        let node = NodeContext {
            url: Url::parse(url).unwrap(),
            title: "Guide",
            dir: Path::new(""),
            segment: "1-Guide",
            index: 1,
            expandable: true,
        };
        let artifact = producer.produce(&node).unwrap();

        assert_eq!(artifact.path, out.join("1-Guide").join("1-Guide.md"));
        let written = fs::read_to_string(&artifact.path).unwrap();
        assert!(written.starts_with("---\ntitle: Guide\nsidebar_position: 1\n---\n\n"));
    }
}
