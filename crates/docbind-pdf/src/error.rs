//! Error types for PDF assembly.

use std::path::PathBuf;

/// Error from PDF toolkit operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The PDF library failed to parse, build, or write a document.
    #[error("PDF error in {}", path.display())]
    Document {
        /// File the operation was working on.
        path: PathBuf,
        /// Error reported by the PDF library.
        #[source]
        source: lopdf::Error,
    },

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// Merge was invoked with no input files.
    #[error("no input files to merge")]
    NoInput,

    /// A document contained no pages to operate on.
    #[error("no pages in {}", .0.display())]
    NoPages(PathBuf),

    /// Split boundaries were empty or not ascending from page 1.
    #[error("invalid split boundaries: {0}")]
    InvalidBoundaries(String),
}

impl PdfError {
    /// Wrap a `lopdf` error with the file it occurred in.
    pub(crate) fn document(path: &std::path::Path, source: lopdf::Error) -> Self {
        Self::Document {
            path: path.to_path_buf(),
            source,
        }
    }
}
