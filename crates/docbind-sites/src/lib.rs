//! Per-site DOM contracts for the supported documentation layouts.
//!
//! Every layout the crawler understands lives here as one module
//! implementing the traversal traits: how to find the navigation menu,
//! read its entries, expand a collapsed section, and groom a page before
//! export. [`SiteProfile::build`] bundles a layout's adapter, cleanup
//! hook, Markdown extraction rules, and link shapes behind one value so
//! the engine and the command line stay layout-agnostic.

mod blog;
mod confluence;
mod docusaurus;
mod profile;

pub use blog::{BlogAdapter, BlogCleanup};
pub use confluence::{ConfluenceAdapter, ConfluenceCleanup};
pub use docusaurus::{DocusaurusAdapter, DocusaurusCleanup};
pub use profile::{SiteKind, SiteProfile, UnknownSite};
