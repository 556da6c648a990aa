//! The toolkit trait consumed by the crawl engine.

use std::path::{Path, PathBuf};

use crate::{Bookmark, PdfError};

/// Low-level PDF operations behind a testable seam.
///
/// Implementations must preserve input order in [`merge`](Self::merge): the
/// page sequence of the output is the concatenation of the inputs' pages in
/// the order given. The crawl engine's bookmark offsets depend on it.
pub trait PdfToolkit {
    /// Number of pages in the document at `path`.
    fn page_count(&self, path: &Path) -> Result<u32, PdfError>;

    /// Merge `inputs` into a single document at `output`, preserving order.
    ///
    /// `output` is created or overwritten. Returns [`PdfError::NoInput`]
    /// when `inputs` is empty.
    fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<(), PdfError>;

    /// Write a copy of `input` to `output` with `bookmarks` attached as the
    /// document outline.
    ///
    /// `input` and `output` may be the same path. An empty bookmark slice
    /// produces a plain copy.
    fn attach_bookmarks(
        &self,
        input: &Path,
        output: &Path,
        bookmarks: &[Bookmark],
    ) -> Result<(), PdfError>;

    /// Split `input` into contiguous parts starting at the given 1-based
    /// page numbers.
    ///
    /// `starts` must be ascending and begin with page 1; each part runs to
    /// the page before the next start (the last to the end of the document).
    /// Parts are written to `output_dir` as `{stem}_{from}-{to}.pdf` and
    /// their paths returned in order.
    fn split_at(
        &self,
        input: &Path,
        output_dir: &Path,
        starts: &[u32],
    ) -> Result<Vec<PathBuf>, PdfError>;
}
