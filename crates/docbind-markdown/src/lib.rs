//! HTML content extraction and Markdown conversion.
//!
//! Rendered documentation pages carry navigation, comment widgets, and
//! other chrome around the article body. This crate turns such a page into
//! a publishable Markdown document in three steps:
//!
//! 1. [`extract_content`] cuts the article body out of the full DOM and
//!    drops the elements a [`ContentRules`] marks for removal
//! 2. [`ImageLocalizer`] downloads site-relative images into a media
//!    directory and points the HTML at the local copies
//! 3. [`MarkdownConverter`] converts the cleaned HTML fragment to
//!    Markdown, with strikethrough markup preserved
//!
//! [`with_front_matter`] prepends the title header expected by static
//! site generators.

mod convert;
mod error;
mod extract;
mod images;
mod rules;

pub use convert::{MarkdownConverter, with_front_matter};
pub use error::MarkdownError;
pub use extract::extract_content;
pub use images::{HttpImageFetcher, ImageFetcher, ImageLocalizer};
pub use rules::ContentRules;
