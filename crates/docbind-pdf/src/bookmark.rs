//! Bookmark tree for merged document outlines.

/// One entry in a merged document's outline.
///
/// Bookmarks form a tree mirroring the navigation tree of the crawled site,
/// in the same order the menu presented its entries. `page` is the absolute
/// 1-based page number in the final merged document where the entry's
/// content starts; an entry always starts at or before every descendant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    /// Display text. This is the original page title, without the character
    /// stripping applied to filesystem path segments.
    pub title: String,
    /// 1-based starting page in the merged output.
    pub page: u32,
    /// Child entries in menu order.
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    /// Create a bookmark with no children.
    pub fn new(title: impl Into<String>, page: u32) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }
}
