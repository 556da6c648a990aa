//! docbind CLI - Documentation site crawler.
//!
//! Provides commands for:
//! - `run`: Crawl every job configured in docbind.toml
//! - `crawl`: Crawl a single site described on the command line

mod commands;
mod error;
mod job;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CrawlArgs, RunArgs};
use output::Output;

/// docbind - Documentation site crawler.
#[derive(Parser)]
#[command(name = "docbind", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl every configured job (or one job, with --job).
    Run(RunArgs),
    /// Crawl a single site from command-line arguments.
    Crawl(CrawlArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Run(args) => args.verbose,
        Commands::Crawl(args) => args.verbose,
    };

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Run(args) => args.execute(),
        Commands::Crawl(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
