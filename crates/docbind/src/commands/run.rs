//! `docbind run` command implementation.

use std::path::PathBuf;

use clap::Args;
use docbind_config::{CliSettings, Config, JobConfig, OutputMode};

use crate::error::CliError;
use crate::job::{self, JobReport};
use crate::output::Output;

/// Arguments for the run command.
#[derive(Args)]
pub(crate) struct RunArgs {
    /// Path to configuration file (default: auto-discover docbind.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run only the named job.
    #[arg(short, long)]
    job: Option<String>,

    /// Output mode for every job: pdf or md (overrides config).
    #[arg(short, long)]
    mode: Option<String>,

    /// Artifacts merged per batch (overrides config).
    #[arg(long)]
    batch_size: Option<usize>,

    /// Page cap per delivered PDF (overrides config).
    #[arg(long)]
    max_pages: Option<u32>,

    /// Menu operation delay in milliseconds (overrides config).
    #[arg(long)]
    op_delay_ms: Option<u64>,

    /// Directory finished outputs are moved into (overrides config).
    #[arg(long)]
    dist_dir: Option<PathBuf>,

    /// Enable verbose output (show per-page render logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any job fails.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let mode: Option<OutputMode> = self.mode.as_deref().map(str::parse).transpose()?;
        let cli_settings = CliSettings {
            mode,
            batch_size: self.batch_size,
            max_pages: self.max_pages,
            op_delay_ms: self.op_delay_ms,
            dist_dir: self.dist_dir.clone(),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        let jobs: Vec<&JobConfig> = match &self.job {
            Some(name) => vec![config.job(name).ok_or_else(|| {
                CliError::Validation(format!("no job named {name:?} in configuration"))
            })?],
            None => config.jobs_resolved.iter().collect(),
        };
        if jobs.is_empty() {
            return Err(CliError::Validation(
                "no jobs configured; add [[job]] tables to docbind.toml".to_owned(),
            ));
        }

        output.highlight(&format!("Running {} job(s)", jobs.len()));

        // Jobs share nothing; each thread owns its own browser.
        let mut failed = 0usize;
        std::thread::scope(|scope| {
            let handles: Vec<_> = jobs
                .iter()
                .map(|job| scope.spawn(move || job::execute(job)))
                .collect();
            for (job, handle) in jobs.iter().zip(handles) {
                match handle.join() {
                    Ok(Ok(report)) => print_report(&output, &job.name, &report),
                    Ok(Err(err)) => {
                        failed += 1;
                        output.error(&format!("Job {} failed: {err}", job.name));
                    }
                    Err(_) => {
                        failed += 1;
                        output.error(&format!("Job {} panicked", job.name));
                    }
                }
            }
        });

        if failed > 0 {
            return Err(CliError::Validation(format!(
                "{failed} of {} job(s) failed",
                jobs.len()
            )));
        }
        Ok(())
    }
}

/// Print one finished job's deliverables.
pub(crate) fn print_report(output: &Output, name: &str, report: &JobReport) {
    match report {
        JobReport::Pdf { outputs, pages } => {
            output.success(&format!("Job {name}: {pages} page(s)"));
            for path in outputs {
                output.info(&format!("  {}", path.display()));
            }
        }
        JobReport::Markdown {
            root,
            documents,
            links_rewritten,
        } => {
            output.success(&format!(
                "Job {name}: {documents} document(s) in {}, {links_rewritten} file(s) re-linked",
                root.display()
            ));
        }
    }
}
