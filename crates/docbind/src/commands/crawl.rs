//! `docbind crawl` command implementation.

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use docbind_config::JobConfig;

use crate::commands::run::print_report;
use crate::error::CliError;
use crate::job;
use crate::output::Output;

/// Arguments for the crawl command.
#[derive(Args)]
pub(crate) struct CrawlArgs {
    /// Index page URL the traversal starts from.
    #[arg(long)]
    url: String,

    /// Output base path; derived names append .pdf, -md and friends to it.
    #[arg(long)]
    out: PathBuf,

    /// Site layout: confluence, docusaurus or blog.
    #[arg(long)]
    site: String,

    /// Output mode: pdf or md.
    #[arg(short, long)]
    mode: Option<String>,

    /// Render the index page itself as the first artifact.
    #[arg(long)]
    include_index: bool,

    /// Bookmark and file title for the index artifact.
    #[arg(long)]
    index_title: Option<String>,

    /// Artifacts merged per batch.
    #[arg(long)]
    batch_size: Option<usize>,

    /// Page cap per delivered PDF.
    #[arg(long)]
    max_pages: Option<u32>,

    /// Menu operation delay in milliseconds.
    #[arg(long)]
    op_delay_ms: Option<u64>,

    /// Directory finished outputs are moved into.
    #[arg(long)]
    dist_dir: Option<PathBuf>,

    /// Enable verbose output (show per-page render logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CrawlArgs {
    /// Execute the crawl command.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments are invalid or the crawl fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let mut job = JobConfig::ad_hoc(&self.url, &self.out, &self.site);
        if let Some(mode) = self.mode.as_deref() {
            job.mode = mode.parse()?;
        }
        job.include_index = self.include_index;
        if let Some(index_title) = self.index_title {
            job.index_title = index_title;
        }
        if let Some(batch_size) = self.batch_size {
            job.batch_size = batch_size;
        }
        if let Some(max_pages) = self.max_pages {
            job.max_pages = Some(max_pages);
        }
        if let Some(op_delay_ms) = self.op_delay_ms {
            job.op_delay = Some(Duration::from_millis(op_delay_ms));
        }
        if let Some(dist_dir) = self.dist_dir {
            job.dist_dir = dist_dir;
        }
        job.validate()?;

        output.highlight(&format!("Crawling {}", job.url));
        let report = job::execute(&job)?;
        print_report(&output, &job.name, &report);
        Ok(())
    }
}
