//! Headless browser rendering surface for docbind.
//!
//! This crate wraps browser control behind three small traits so the crawl
//! engine never talks to a browser library directly:
//!
//! - [`Renderer`] opens URLs and hands back pages
//! - [`Page`] waits for stability, queries the DOM, runs script, and
//!   exports the rendered view as PDF bytes or an HTML string
//! - [`DomElement`] supports the menu-walking primitives: scoped queries,
//!   attribute and text reads, clicks, scrolling
//!
//! [`ChromeRenderer`] drives a headless Chrome instance. [`MockRenderer`]
//! (behind the `mock` feature) serves scripted pages from memory so
//! traversal logic is testable without a browser.
//!
//! Element lookups that fail return `None` rather than an error: a missing
//! menu anchor is an expected per-node condition the caller skips past, not
//! a reason to abort a crawl.

mod chrome;
mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod renderer;

pub use chrome::ChromeRenderer;
pub use error::BrowserError;
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRenderer;
pub use renderer::{DomElement, Page, PdfExportOptions, Renderer};
