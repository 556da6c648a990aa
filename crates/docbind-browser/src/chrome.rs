//! Renderer implementation over headless Chrome.

use std::sync::Arc;
use std::time::Duration;

use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};

use crate::{BrowserError, DomElement, Page, PdfExportOptions, Renderer};

/// Idle timeout for the browser connection. Crawls spend minutes per site,
/// far beyond the library default of thirty seconds.
const IDLE_TIMEOUT: Duration = Duration::from_secs(3600);

/// [`Renderer`] driving a headless Chrome process.
///
/// The browser is launched on construction and torn down on drop. One
/// instance serves one crawl job; jobs running concurrently each launch
/// their own.
pub struct ChromeRenderer {
    browser: Browser,
}

impl ChromeRenderer {
    /// Launch a headless browser.
    pub fn new() -> Result<Self, BrowserError> {
        let browser = Browser::new(LaunchOptions {
            headless: true,
            window_size: Some((1280, 800)),
            idle_browser_timeout: IDLE_TIMEOUT,
            ..Default::default()
        })
        .map_err(|e| BrowserError::Launch(e.to_string()))?;
        Ok(Self { browser })
    }
}

impl Renderer for ChromeRenderer {
    fn open(&self, url: &str) -> Result<Box<dyn Page>, BrowserError> {
        let tab = self.browser.new_tab().map_err(|e| BrowserError::Navigation {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
        tab.navigate_to(url).map_err(|e| BrowserError::Navigation {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
        Ok(Box::new(ChromePage { tab }))
    }
}

struct ChromePage {
    tab: Arc<Tab>,
}

impl Page for ChromePage {
    fn wait_stable(&self) -> Result<(), BrowserError> {
        self.tab
            .wait_until_navigated()
            .map_err(|e| BrowserError::Navigation {
                url: self.tab.get_url(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>> {
        match self.tab.find_element(selector) {
            Ok(element) => Some(wrap(&self.tab, &element)),
            Err(e) => {
                tracing::debug!(selector, error = %e, "page query found nothing");
                None
            }
        }
    }

    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>> {
        match self.tab.find_elements(selector) {
            Ok(elements) => elements.iter().map(|e| wrap(&self.tab, e)).collect(),
            Err(e) => {
                tracing::debug!(selector, error = %e, "page query_all found nothing");
                Vec::new()
            }
        }
    }

    fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| BrowserError::Evaluate(e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    fn export_pdf(&self, options: &PdfExportOptions) -> Result<Vec<u8>, BrowserError> {
        self.tab
            .print_to_pdf(Some(PrintToPdfOptions {
                paper_width: options.paper_width,
                paper_height: options.paper_height,
                print_background: Some(options.print_background),
                ..Default::default()
            }))
            .map_err(|e| BrowserError::Export(e.to_string()))
    }

    fn export_html(&self) -> Result<String, BrowserError> {
        self.tab
            .get_content()
            .map_err(|e| BrowserError::Export(e.to_string()))
    }

    fn close(&self) {
        if let Err(e) = self.tab.close(false) {
            tracing::debug!(error = %e, "closing tab failed");
        }
    }
}

fn wrap(tab: &Arc<Tab>, element: &Element<'_>) -> Box<dyn DomElement> {
    Box::new(ChromeElement {
        tab: Arc::clone(tab),
        node_id: element.node_id,
    })
}

/// Element handle addressed by its DOM node id.
///
/// The underlying library ties element values to the lifetime of a tab
/// borrow, so the node id is kept instead and the element is rebuilt per
/// operation.
struct ChromeElement {
    tab: Arc<Tab>,
    node_id: u32,
}

impl ChromeElement {
    fn with_element<T>(
        &self,
        op: impl FnOnce(&Element<'_>) -> Result<T, BrowserError>,
    ) -> Result<T, BrowserError> {
        let element = Element::new(&self.tab, self.node_id)
            .map_err(|e| BrowserError::Interaction(e.to_string()))?;
        op(&element)
    }
}

impl DomElement for ChromeElement {
    fn query(&self, selector: &str) -> Option<Box<dyn DomElement>> {
        let found = self.with_element(|element| {
            element
                .find_element(selector)
                .map(|child| wrap(&self.tab, &child))
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        });
        match found {
            Ok(child) => Some(child),
            Err(e) => {
                tracing::debug!(selector, error = %e, "element query found nothing");
                None
            }
        }
    }

    fn query_all(&self, selector: &str) -> Vec<Box<dyn DomElement>> {
        let found = self.with_element(|element| {
            element
                .find_elements(selector)
                .map(|children| children.iter().map(|c| wrap(&self.tab, c)).collect())
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        });
        match found {
            Ok(children) => children,
            Err(e) => {
                tracing::debug!(selector, error = %e, "element query_all found nothing");
                Vec::new()
            }
        }
    }

    fn attribute(&self, name: &str) -> Option<String> {
        self.with_element(|element| {
            element
                .get_attribute_value(name)
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        })
        .ok()
        .flatten()
    }

    fn text(&self) -> Option<String> {
        self.with_element(|element| {
            element
                .get_inner_text()
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        })
        .ok()
    }

    fn click(&self) -> Result<(), BrowserError> {
        self.with_element(|element| {
            element
                .click()
                .map(|_| ())
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        })
    }

    fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.with_element(|element| {
            element
                .scroll_into_view()
                .map(|_| ())
                .map_err(|e| BrowserError::Interaction(e.to_string()))
        })
    }
}
