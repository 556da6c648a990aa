//! CLI command implementations.

pub(crate) mod crawl;
pub(crate) mod run;

pub(crate) use crawl::CrawlArgs;
pub(crate) use run::RunArgs;
