//! Site selection and wiring.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use docbind_crawl::adapter::{MenuAdapter, PageCleanupHook};
use docbind_markdown::ContentRules;
use regex::Regex;

use crate::blog::{BlogAdapter, BlogCleanup};
use crate::confluence::{ConfluenceAdapter, ConfluenceCleanup};
use crate::docusaurus::{DocusaurusAdapter, DocusaurusCleanup};
use crate::{blog, confluence, docusaurus};

/// The site layouts the crawler knows how to traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    /// Confluence wiki space with a page tree pane.
    Confluence,
    /// Docusaurus site with a collapsible sidebar.
    Docusaurus,
    /// Flat blog archive listing every article on one index page.
    Blog,
}

/// A site name that matches none of the supported layouts.
#[derive(Debug, thiserror::Error)]
#[error("unknown site {0:?}, expected confluence, docusaurus or blog")]
pub struct UnknownSite(String);

impl FromStr for SiteKind {
    type Err = UnknownSite;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confluence" => Ok(Self::Confluence),
            "docusaurus" => Ok(Self::Docusaurus),
            "blog" => Ok(Self::Blog),
            _ => Err(UnknownSite(s.to_owned())),
        }
    }
}

impl fmt::Display for SiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Confluence => "confluence",
            Self::Docusaurus => "docusaurus",
            Self::Blog => "blog",
        };
        f.write_str(name)
    }
}

/// Everything the crawl engine needs to drive one site layout.
pub struct SiteProfile {
    pub kind: SiteKind,
    pub adapter: Box<dyn MenuAdapter>,
    pub cleanup: Box<dyn PageCleanupHook>,
    /// Content extraction rules for Markdown output.
    pub content: ContentRules,
    /// Site-relative link shapes eligible for rewriting to local pages.
    pub link_pattern: Regex,
    /// Whether PDF export should paint background graphics.
    pub print_background: bool,
}

impl SiteProfile {
    /// Assemble the profile for `kind`. `op_delay` overrides the site's
    /// own pacing default for menu interactions.
    pub fn build(kind: SiteKind, op_delay: Option<Duration>) -> Self {
        match kind {
            SiteKind::Confluence => Self {
                kind,
                adapter: Box::new(ConfluenceAdapter::new(
                    op_delay.unwrap_or(confluence::DEFAULT_OP_DELAY),
                )),
                cleanup: Box::new(ConfluenceCleanup),
                content: confluence::content_rules(),
                link_pattern: confluence::link_pattern(),
                print_background: true,
            },
            SiteKind::Docusaurus => Self {
                kind,
                adapter: Box::new(DocusaurusAdapter::new(
                    op_delay.unwrap_or(docusaurus::DEFAULT_OP_DELAY),
                )),
                cleanup: Box::new(DocusaurusCleanup::new()),
                content: docusaurus::content_rules(),
                link_pattern: docusaurus::link_pattern(),
                print_background: true,
            },
            SiteKind::Blog => Self {
                kind,
                adapter: Box::new(BlogAdapter),
                cleanup: Box::new(BlogCleanup::new()),
                content: blog::content_rules(),
                link_pattern: blog::link_pattern(),
                // The archive's articles print cleanly on white.
                print_background: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn kinds_parse_case_insensitively_and_print_lowercase() {
        for (name, kind) in [
            ("Confluence", SiteKind::Confluence),
            ("DOCUSAURUS", SiteKind::Docusaurus),
            ("blog", SiteKind::Blog),
        ] {
            assert_eq!(name.parse::<SiteKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), name.to_ascii_lowercase());
        }
        assert!("gitbook".parse::<SiteKind>().is_err());
    }

    #[test]
    fn profiles_wire_the_matching_menu_roots() {
        let wiki = SiteProfile::build(SiteKind::Confluence, None);
        assert_eq!(wiki.adapter.menu_root_selector(), confluence::MENU_ROOT);
        assert!(wiki.print_background);

        let docs = SiteProfile::build(SiteKind::Docusaurus, None);
        assert_eq!(docs.adapter.menu_root_selector(), docusaurus::MENU_ROOT);
        assert!(docs.print_background);

        let archive = SiteProfile::build(SiteKind::Blog, Some(Duration::from_millis(50)));
        assert_eq!(archive.adapter.menu_root_selector(), blog::MENU_ROOT);
        assert!(!archive.print_background);
    }
}
