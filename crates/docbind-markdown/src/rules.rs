/// Per-site rules for locating the article body within a rendered page.
#[derive(Debug, Clone)]
pub struct ContentRules {
    /// Selector for the element holding the article body.
    pub content_selector: String,
    /// Selectors for elements to remove from the body before conversion,
    /// such as metadata bars, like buttons, or comment sections.
    pub strip_selectors: Vec<String>,
}

impl ContentRules {
    /// Rules extracting the element matched by `content_selector`.
    pub fn new(content_selector: impl Into<String>) -> Self {
        Self {
            content_selector: content_selector.into(),
            strip_selectors: Vec::new(),
        }
    }

    /// Add a selector whose matches are removed from the extracted body.
    #[must_use]
    pub fn strip(mut self, selector: impl Into<String>) -> Self {
        self.strip_selectors.push(selector.into());
        self
    }
}
