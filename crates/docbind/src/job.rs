//! One crawl job, from index page to delivered files.
//!
//! A job owns its browser: concurrent jobs each launch their own and share
//! nothing. Per-node trouble is handled inside the walker; everything that
//! reaches this level aborts the job (and only this job).

use std::cell::RefCell;
use std::path::{Path, PathBuf};

use docbind_browser::{ChromeRenderer, DomElement, Page, Renderer};
use docbind_config::{JobConfig, OutputMode};
use docbind_crawl::{
    Artifact, ArtifactProducer, BatchAssembler, CrawlError, LinkMap, MarkdownProducer,
    NodeContext, PdfProducer, ThreadSleeper, TreeWalker, sanitize_title,
};
use docbind_markdown::{HttpImageFetcher, ImageLocalizer, MarkdownConverter};
use docbind_pdf::{Bookmark, LopdfToolkit};
use docbind_sites::{SiteKind, SiteProfile};
use url::Url;

use crate::error::CliError;

/// What one finished job delivered.
pub(crate) enum JobReport {
    Pdf {
        /// The merged document, or its split parts.
        outputs: Vec<PathBuf>,
        /// Pages across all delivered parts.
        pages: u32,
    },
    Markdown {
        /// Root of the written tree.
        root: PathBuf,
        /// Documents in the tree, cached ones included.
        documents: usize,
        /// Files whose links the rewrite pass updated.
        links_rewritten: usize,
    },
}

/// Run one job to completion.
pub(crate) fn execute(job: &JobConfig) -> Result<JobReport, CliError> {
    let kind: SiteKind = job.site.parse()?;
    let profile = SiteProfile::build(kind, job.op_delay);
    let base = Url::parse(&job.url)?;
    tracing::info!(job = %job.name, site = %kind, url = %job.url, "starting crawl");

    let renderer = ChromeRenderer::new()?;
    let page = renderer.open(&job.url)?;
    page.wait_stable()?;
    let selector = profile.adapter.menu_root_selector();
    let menu_root = page
        .query(selector)
        .ok_or_else(|| CrawlError::MenuRootMissing {
            selector: selector.to_owned(),
        })?;

    let report = match job.mode {
        OutputMode::Pdf => pdf_book(job, &profile, &renderer, page.as_ref(), menu_root.as_ref(), &base)?,
        OutputMode::Markdown => {
            markdown_tree(job, &profile, &renderer, page.as_ref(), menu_root.as_ref(), &base)?
        }
    };
    page.close();
    Ok(report)
}

/// Crawl into per-node PDFs, fold them into one bookmarked document, and
/// move the result into the dist directory.
fn pdf_book(
    job: &JobConfig,
    profile: &SiteProfile,
    renderer: &dyn Renderer,
    page: &dyn Page,
    menu_root: &dyn DomElement,
    base: &Url,
) -> Result<JobReport, CliError> {
    let toolkit = LopdfToolkit::new();
    let producer = PdfProducer::new(
        renderer,
        &toolkit,
        profile.cleanup.as_ref(),
        &job.out,
        job.paper_width,
        profile.print_background,
    );
    let sleeper = ThreadSleeper;
    let walker = TreeWalker::new(profile.adapter.as_ref(), &producer, &sleeper, base.clone());

    let mut files = Vec::new();
    let mut bookmarks = Vec::new();
    let mut first_page = 1;
    if job.include_index {
        match index_artifact(&producer, job, base) {
            Ok(artifact) => {
                bookmarks.push(Bookmark::new(job.index_title.clone(), 1));
                first_page += artifact.pages;
                files.push(artifact.path);
            }
            Err(e) => {
                tracing::warn!(error = %e, "index page failed, continuing without it");
            }
        }
    }

    let outcome = walker.walk(page, menu_root, first_page);
    files.extend(outcome.files);
    bookmarks.extend(outcome.bookmarks);
    let pages = first_page - 1 + outcome.pages;

    let assembler = BatchAssembler::new(&toolkit, job.batch_size);
    let outputs = assembler.assemble(&files, &bookmarks, &job.out, job.max_pages)?;
    let outputs = relocate(&outputs, &job.dist_dir);
    Ok(JobReport::Pdf { outputs, pages })
}

/// Crawl into a Markdown tree, then save the link map and rewrite
/// recorded links across the tree.
fn markdown_tree(
    job: &JobConfig,
    profile: &SiteProfile,
    renderer: &dyn Renderer,
    page: &dyn Page,
    menu_root: &dyn DomElement,
    base: &Url,
) -> Result<JobReport, CliError> {
    let md_root = suffixed(&job.out, "-md");
    let html_cache = suffixed(&job.out, "-html");
    let media_dir = suffixed(&job.out, "-static").join("markdown");
    let links_path = md_root.join("links.json");

    let link_map = RefCell::new(LinkMap::load(job.docs_base.as_str(), &links_path)?);
    let converter = MarkdownConverter::new();
    let localizer = ImageLocalizer::new(HttpImageFetcher::new(), &media_dir, "/markdown");
    let producer = MarkdownProducer::new(
        renderer,
        &converter,
        &profile.content,
        &localizer,
        &md_root,
        &html_cache,
        &link_map,
    );
    let sleeper = ThreadSleeper;
    let walker = TreeWalker::new(profile.adapter.as_ref(), &producer, &sleeper, base.clone());

    let mut documents = 0;
    if job.include_index {
        match index_artifact(&producer, job, base) {
            Ok(_) => documents += 1,
            Err(e) => {
                tracing::warn!(error = %e, "index page failed, continuing without it");
            }
        }
    }

    let outcome = walker.walk(page, menu_root, 1);
    documents += outcome.files.len();

    let map = link_map.into_inner();
    map.save(&links_path)?;
    let links_rewritten = map.rewrite_tree(&md_root, &profile.link_pattern, base)?;
    Ok(JobReport::Markdown {
        root: md_root,
        documents,
        links_rewritten,
    })
}

/// Render the job's own index page as the first artifact.
fn index_artifact(
    producer: &dyn ArtifactProducer,
    job: &JobConfig,
    base: &Url,
) -> Result<Artifact, CrawlError> {
    let segment = sanitize_title(&job.index_title);
    producer.produce(&NodeContext {
        url: base.clone(),
        title: &job.index_title,
        dir: Path::new(""),
        segment: &segment,
        index: 0,
        expandable: false,
    })
}

/// Derive a sibling path by appending `suffix` to the base name.
fn suffixed(base: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{suffix}", base.display()))
}

/// Move finished outputs into the dist directory. Failure to move keeps
/// the original path; the document itself is already complete.
fn relocate(outputs: &[PathBuf], dist: &Path) -> Vec<PathBuf> {
    if let Err(e) = std::fs::create_dir_all(dist) {
        tracing::warn!(error = %e, dir = %dist.display(), "cannot create dist directory, leaving outputs in place");
        return outputs.to_vec();
    }
    outputs
        .iter()
        .map(|path| {
            let Some(name) = path.file_name() else {
                return path.clone();
            };
            let target = dist.join(name);
            match move_file(path, &target) {
                Ok(()) => target,
                Err(e) => {
                    tracing::warn!(error = %e, file = %path.display(), "could not move into dist, leaving in place");
                    path.clone()
                }
            }
        })
        .collect()
}

/// Rename, falling back to copy-and-delete across filesystems.
fn move_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }
    std::fs::copy(src, dst)?;
    std::fs::remove_file(src)?;
    Ok(())
}
