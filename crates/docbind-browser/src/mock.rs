//! Scripted in-memory renderer for tests.
//!
//! [`MockRenderer`] serves pages parsed from HTML strings. A page carries a
//! sequence of DOM stages; every click advances to the next stage, which is
//! how collapsed-menu expansion is simulated. Element handles address their
//! element by its child-index path from the document root, so a handle
//! obtained before a stage change still resolves afterwards, matching how
//! a browser node survives sibling insertions.
//!
//! Page state is shared between the renderer and its open pages, so a test
//! can open a page, interact, and then read counters off the renderer.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use scraper::{ElementRef, Html, Selector};

use crate::{BrowserError, DomElement, Page, PdfExportOptions, Renderer};

/// Builder for one scripted page.
pub struct MockPage {
    stages: Vec<String>,
    pdf: Option<Vec<u8>>,
    eval_results: VecDeque<serde_json::Value>,
}

impl MockPage {
    /// A page whose initial DOM is `html`.
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            stages: vec![html.into()],
            pdf: None,
            eval_results: VecDeque::new(),
        }
    }

    /// Append a DOM stage revealed by the next click.
    #[must_use]
    pub fn with_stage(mut self, html: impl Into<String>) -> Self {
        self.stages.push(html.into());
        self
    }

    /// Bytes returned from every [`Page::export_pdf`] call.
    #[must_use]
    pub fn with_pdf(mut self, bytes: Vec<u8>) -> Self {
        self.pdf = Some(bytes);
        self
    }

    /// Queue a result for [`Page::evaluate`]; once the queue is drained,
    /// evaluation returns JSON null.
    #[must_use]
    pub fn with_evaluation(mut self, value: serde_json::Value) -> Self {
        self.eval_results.push_back(value);
        self
    }
}

struct PageState {
    stages: Vec<String>,
    stage: usize,
    pdf: Option<Vec<u8>>,
    eval_results: VecDeque<serde_json::Value>,
    clicks: usize,
    closes: usize,
    evaluations: Vec<String>,
    pdf_exports: Vec<PdfExportOptions>,
}

impl PageState {
    fn current(&self) -> &str {
        &self.stages[self.stage]
    }
}

/// [`Renderer`] backed by scripted pages.
///
/// State persists across repeated opens of the same URL, so expansion done
/// through one page handle is visible through the next.
#[derive(Default)]
pub struct MockRenderer {
    pages: HashMap<String, Rc<RefCell<PageState>>>,
    navigations: Rc<RefCell<Vec<String>>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page under `url`.
    #[must_use]
    pub fn with_page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        let state = PageState {
            stages: page.stages,
            stage: 0,
            pdf: page.pdf,
            eval_results: page.eval_results,
            clicks: 0,
            closes: 0,
            evaluations: Vec::new(),
            pdf_exports: Vec::new(),
        };
        self.pages.insert(url.into(), Rc::new(RefCell::new(state)));
        self
    }

    /// URLs opened so far, in order.
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.borrow().clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.borrow().len()
    }

    /// Clicks recorded on the page at `url`; zero when unknown.
    pub fn clicks(&self, url: &str) -> usize {
        self.pages.get(url).map_or(0, |p| p.borrow().clicks)
    }

    /// Close calls recorded on the page at `url`; zero when unknown.
    pub fn closes(&self, url: &str) -> usize {
        self.pages.get(url).map_or(0, |p| p.borrow().closes)
    }

    /// Scripts evaluated on the page at `url`, in order.
    pub fn evaluations(&self, url: &str) -> Vec<String> {
        self.pages
            .get(url)
            .map_or_else(Vec::new, |p| p.borrow().evaluations.clone())
    }

    /// Options passed to each PDF export on the page at `url`, in order.
    pub fn pdf_exports(&self, url: &str) -> Vec<PdfExportOptions> {
        self.pages
            .get(url)
            .map_or_else(Vec::new, |p| p.borrow().pdf_exports.clone())
    }
}

impl Renderer for MockRenderer {
    fn open(&self, url: &str) -> Result<Box<dyn Page>, BrowserError> {
        let state = self
            .pages
            .get(url)
            .ok_or_else(|| BrowserError::Navigation {
                url: url.to_owned(),
                message: "no scripted page registered".to_owned(),
            })?;
        self.navigations.borrow_mut().push(url.to_owned());
        Ok(Box::new(MockPageHandle {
            state: Rc::clone(state),
        }))
    }
}

struct MockPageHandle {
    state: Rc<RefCell<PageState>>,
}

impl Page for MockPageHandle {
    fn wait_stable(&self) -> Result<(), BrowserError> {
        Ok(())
    }

    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>> {
        let state = self.state.borrow();
        let dom = Html::parse_document(state.current());
        let root = dom.root_element();
        let path = find_all(&root, selector).into_iter().next()?;
        Some(self.handle(path))
    }

    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>> {
        let state = self.state.borrow();
        let dom = Html::parse_document(state.current());
        let root = dom.root_element();
        find_all(&root, selector)
            .into_iter()
            .map(|path| self.handle(path))
            .collect()
    }

    fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let mut state = self.state.borrow_mut();
        state.evaluations.push(script.to_owned());
        Ok(state
            .eval_results
            .pop_front()
            .unwrap_or(serde_json::Value::Null))
    }

    fn export_pdf(&self, options: &PdfExportOptions) -> Result<Vec<u8>, BrowserError> {
        let mut state = self.state.borrow_mut();
        state.pdf_exports.push(options.clone());
        state
            .pdf
            .clone()
            .ok_or_else(|| BrowserError::Export("no PDF bytes scripted".to_owned()))
    }

    fn export_html(&self) -> Result<String, BrowserError> {
        Ok(self.state.borrow().current().to_owned())
    }

    fn close(&self) {
        self.state.borrow_mut().closes += 1;
    }
}

impl MockPageHandle {
    fn handle(&self, path: Vec<usize>) -> Box<dyn DomElement> {
        Box::new(MockElement {
            state: Rc::clone(&self.state),
            path,
        })
    }
}

/// Element handle addressed by child-index path from the document root.
struct MockElement {
    state: Rc<RefCell<PageState>>,
    path: Vec<usize>,
}

impl MockElement {
    fn read<T>(&self, op: impl FnOnce(Option<ElementRef<'_>>) -> T) -> T {
        let state = self.state.borrow();
        let dom = Html::parse_document(state.current());
        op(resolve(&dom.root_element(), &self.path))
    }
}

impl DomElement for MockElement {
    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>> {
        let path = self.read(|element| {
            element.and_then(|el| find_all(&el, selector).into_iter().next())
        })?;
        Some(Box::new(MockElement {
            state: Rc::clone(&self.state),
            path,
        }))
    }

    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>> {
        let paths = self.read(|element| {
            element.map_or_else(Vec::new, |el| find_all(&el, selector))
        });
        paths
            .into_iter()
            .map(|path| {
                Box::new(MockElement {
                    state: Rc::clone(&self.state),
                    path,
                }) as Box<dyn DomElement>
            })
            .collect()
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.read(|element| element.and_then(|el| el.value().attr(name).map(str::to_owned)))
    }

    fn text(&self) -> Option<String> {
        self.read(|element| element.map(|el| el.text().collect::<String>().trim().to_owned()))
    }

    fn click(&self) -> Result<(), BrowserError> {
        let attached = self.read(|element| element.is_some());
        if !attached {
            return Err(BrowserError::Interaction(
                "element no longer attached".to_owned(),
            ));
        }
        let mut state = self.state.borrow_mut();
        state.clicks += 1;
        if state.stage + 1 < state.stages.len() {
            state.stage += 1;
        }
        Ok(())
    }

    fn scroll_into_view(&self) -> Result<(), BrowserError> {
        if self.read(|element| element.is_some()) {
            Ok(())
        } else {
            Err(BrowserError::Interaction(
                "element no longer attached".to_owned(),
            ))
        }
    }
}

/// Walk `path` down from `root`, stepping through element children only.
fn resolve<'a>(root: &ElementRef<'a>, path: &[usize]) -> Option<ElementRef<'a>> {
    let mut node = *root;
    for &index in path {
        node = node.children().filter_map(ElementRef::wrap).nth(index)?;
    }
    Some(node)
}

/// Child-index path of `target` relative to `root`.
fn path_of(root: &ElementRef<'_>, target: &ElementRef<'_>) -> Vec<usize> {
    let mut path = Vec::new();
    let mut node = **target;
    while node.id() != root.id() {
        let index = node
            .prev_siblings()
            .filter(|sibling| sibling.value().is_element())
            .count();
        path.push(index);
        match node.parent() {
            Some(parent) => node = parent,
            None => break,
        }
    }
    path.reverse();
    path
}

/// Paths of all elements under `scope` matching `selector`, in document
/// order. `:scope > compound` matches direct children; everything else is
/// a descendant search with the selector evaluated in document context.
fn find_all(scope: &ElementRef<'_>, selector: &str) -> Vec<Vec<usize>> {
    let root = document_root(scope);
    if let Some(compound) = selector.trim().strip_prefix(":scope >") {
        let compound = compound.trim();
        return scope
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| matches_compound(child, compound))
            .map(|child| path_of(&root, &child))
            .collect();
    }
    let Ok(parsed) = Selector::parse(selector) else {
        tracing::debug!(selector, "unparseable selector");
        return Vec::new();
    };
    scope
        .select(&parsed)
        .map(|found| path_of(&root, &found))
        .collect()
}

fn document_root<'a>(scope: &ElementRef<'a>) -> ElementRef<'a> {
    scope
        .ancestors()
        .filter_map(ElementRef::wrap)
        .last()
        .unwrap_or(*scope)
}

/// Match a compound selector of the shape `tag`, `.class`, `#id`, or any
/// concatenation of those, against one element.
fn matches_compound(element: &ElementRef<'_>, compound: &str) -> bool {
    let value = element.value();
    let mut rest = compound;
    if rest.is_empty() {
        return false;
    }
    if !rest.starts_with(['.', '#']) {
        let end = rest.find(['.', '#']).unwrap_or(rest.len());
        let (tag, tail) = rest.split_at(end);
        if tag != "*" && !value.name().eq_ignore_ascii_case(tag) {
            return false;
        }
        rest = tail;
    }
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            let end = tail.find(['.', '#']).unwrap_or(tail.len());
            let (class, remainder) = tail.split_at(end);
            if !value.classes().any(|c| c == class) {
                return false;
            }
            rest = remainder;
        } else if let Some(tail) = rest.strip_prefix('#') {
            let end = tail.find(['.', '#']).unwrap_or(tail.len());
            let (id, remainder) = tail.split_at(end);
            if value.id() != Some(id) {
                return false;
            }
            rest = remainder;
        } else {
            return false;
        }
    }
    true
}
