//! Description rendering for cached tags.
//!
//! Rendering is kept pure: collaborators accept markdown or HTML and return new
//! strings. The cache decides what to do with failures.

mod links;
mod markdown;
mod pipeline;
mod text;
mod types;

pub use links::{DEFAULT_TAG_LINK_BASE, ShortLinkTagLinker};
pub use markdown::ComrakMarkdownRenderer;
pub use pipeline::DescriptionRenderer;
pub use text::HtmlTextExtractor;
pub use types::{MarkdownRenderer, RenderError, TagLinker, TextExtractor};
