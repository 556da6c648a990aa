//! PDF assembly toolkit for docbind.
//!
//! This crate provides a [`PdfToolkit`] trait for the low-level PDF
//! operations the crawl engine needs:
//!
//! - **Page counting** for offset bookkeeping
//! - **Order-preserving merge** of many files into one
//! - **Outline attachment** from a hierarchical [`Bookmark`] tree
//! - **Page-range splitting** for size-bounded output parts
//!
//! [`LopdfToolkit`] implements the trait over `lopdf` documents. The trait
//! seam exists so the crawl engine can be tested against a recording double
//! without touching real files.
//!
//! # Example
//!
//! ```ignore
//! use docbind_pdf::{Bookmark, LopdfToolkit, PdfToolkit};
//!
//! let toolkit = LopdfToolkit::new();
//! toolkit.merge(&chapters, Path::new("book.pdf"))?;
//! toolkit.attach_bookmarks(Path::new("book.pdf"), Path::new("book.pdf"), &outline)?;
//! ```

mod bookmark;
mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
mod lopdf_toolkit;
mod toolkit;

pub use bookmark::Bookmark;
pub use error::PdfError;
pub use lopdf_toolkit::LopdfToolkit;
pub use toolkit::PdfToolkit;
