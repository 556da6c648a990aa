//! Article body extraction.

use scraper::{ElementRef, Html, Selector};

use crate::{ContentRules, MarkdownError};

/// Extract the inner HTML of the article body from a full page.
///
/// Elements matched by the strip selectors are detached from the body
/// before serialization. Strip selectors that match nothing are fine;
/// a content selector that matches nothing is an error, since it means
/// the page is not of the expected shape.
pub fn extract_content(html: &str, rules: &ContentRules) -> Result<String, MarkdownError> {
    let content_selector = parse_selector(&rules.content_selector)?;
    let mut dom = Html::parse_document(html);

    let content_id = dom
        .select(&content_selector)
        .next()
        .ok_or_else(|| MarkdownError::MissingContent {
            selector: rules.content_selector.clone(),
        })?
        .id();

    let mut doomed = Vec::new();
    for raw in &rules.strip_selectors {
        let selector = parse_selector(raw)?;
        let content = element_by_id(&dom, content_id)?;
        doomed.extend(content.select(&selector).map(|el| el.id()));
    }
    for id in doomed {
        if let Some(mut node) = dom.tree.get_mut(id) {
            node.detach();
        }
    }

    Ok(element_by_id(&dom, content_id)?.inner_html())
}

fn parse_selector(raw: &str) -> Result<Selector, MarkdownError> {
    Selector::parse(raw).map_err(|_| MarkdownError::Selector(raw.to_owned()))
}

fn element_by_id(
    dom: &Html,
    id: ego_tree::NodeId,
) -> Result<ElementRef<'_>, MarkdownError> {
    dom.tree
        .get(id)
        .and_then(ElementRef::wrap)
        .ok_or_else(|| MarkdownError::Convert("content node lost during cleanup".to_owned()))
}
