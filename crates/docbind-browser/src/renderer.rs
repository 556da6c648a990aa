//! Rendering traits consumed by the crawl engine.

use crate::BrowserError;

/// Options for exporting a page as PDF bytes.
///
/// Widths and heights are in inches, matching the print-to-PDF protocol.
/// Leaving `paper_height` unset lets the browser paginate at its default
/// page height; the artifact producer uses this for a first measuring pass
/// before re-exporting at a height that fits the whole page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfExportOptions {
    /// Paper width in inches.
    pub paper_width: Option<f64>,
    /// Paper height in inches.
    pub paper_height: Option<f64>,
    /// Render background graphics.
    pub print_background: bool,
}

/// Opens URLs in a browser and returns page handles.
///
/// One renderer owns one browser instance. A renderer must only be driven
/// from one traversal at a time; concurrent jobs each construct their own.
pub trait Renderer {
    /// Navigate a new tab to `url`.
    ///
    /// The returned page may still be loading; call [`Page::wait_stable`]
    /// before reading from it.
    fn open(&self, url: &str) -> Result<Box<dyn Page>, BrowserError>;
}

/// One open browser page.
pub trait Page {
    /// Block until the page has finished its initial load.
    fn wait_stable(&self) -> Result<(), BrowserError>;

    /// First element matching a CSS selector, or `None` when absent.
    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>>;

    /// All elements matching a CSS selector, in document order.
    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>>;

    /// Evaluate a script expression in the page, returning its JSON value.
    fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Export the current view as PDF bytes.
    fn export_pdf(&self, options: &PdfExportOptions) -> Result<Vec<u8>, BrowserError>;

    /// Serialize the current DOM to an HTML string.
    fn export_html(&self) -> Result<String, BrowserError>;

    /// Release the page. Errors are logged, not surfaced.
    fn close(&self);
}

impl std::fmt::Debug for dyn Page + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Page")
    }
}

/// A handle to one element within a page.
///
/// Handles stay valid while the element remains in the document; queries
/// through a handle observe DOM changes made after it was obtained, which
/// is what menu expansion relies on.
pub trait DomElement {
    /// First descendant matching a CSS selector. Selectors starting with
    /// `:scope >` match direct children only.
    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>>;

    /// All descendants matching a CSS selector, in document order.
    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>>;

    /// Value of an attribute, or `None` when missing.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Rendered text content, or `None` when it cannot be read.
    fn text(&self) -> Option<String>;

    /// Click the element.
    fn click(&self) -> Result<(), BrowserError>;

    /// Scroll the element into the viewport.
    fn scroll_into_view(&self) -> Result<(), BrowserError>;
}
