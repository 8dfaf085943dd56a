use std::sync::Arc;

use tracing::warn;

use crate::domain::entities::{CachedTag, TagRecord};

use super::links::ShortLinkTagLinker;
use super::markdown::ComrakMarkdownRenderer;
use super::text::HtmlTextExtractor;
use super::types::{MarkdownRenderer, RenderError, TagLinker, TextExtractor};

/// Link resolution, markdown rendering and text extraction for tag descriptions.
#[derive(Clone)]
pub struct DescriptionRenderer {
    linker: Arc<dyn TagLinker>,
    markdown: Arc<dyn MarkdownRenderer>,
    text: Arc<dyn TextExtractor>,
}

impl DescriptionRenderer {
    pub fn new(
        linker: Arc<dyn TagLinker>,
        markdown: Arc<dyn MarkdownRenderer>,
        text: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            linker,
            markdown,
            text,
        }
    }

    /// Comrak + lol_html pipeline with short links pointing at `link_base`.
    pub fn standard(link_base: impl Into<String>) -> Self {
        Self::new(
            Arc::new(ShortLinkTagLinker::new(link_base)),
            Arc::new(ComrakMarkdownRenderer::new()),
            Arc::new(HtmlTextExtractor::new()),
        )
    }

    /// Render a tag for display.
    ///
    /// Blank descriptions are left untouched and the title stands in for the
    /// text. If rendering fails the stored markdown is kept and the title is
    /// used as text.
    pub fn render(&self, mut tag: TagRecord) -> CachedTag {
        if tag.description.trim().is_empty() {
            let description_text = tag.title.clone();
            return CachedTag {
                tag,
                description_text,
                title_lower_case: None,
            };
        }

        match self.render_description(&tag.description) {
            Ok((html, text)) => {
                tag.description = html;
                CachedTag {
                    tag,
                    description_text: text,
                    title_lower_case: None,
                }
            }
            Err(err) => {
                warn!(
                    target = "tagcache::render",
                    tag_id = tag.id,
                    title = %tag.title,
                    error = %err,
                    "Tag description rendering failed; falling back to source"
                );
                let description_text = tag.title.clone();
                CachedTag {
                    tag,
                    description_text,
                    title_lower_case: None,
                }
            }
        }
    }

    fn render_description(&self, markdown: &str) -> Result<(String, String), RenderError> {
        let linked = self.linker.link_tags(markdown);
        let html = self.markdown.to_html(&linked)?;
        let text = self.text.to_text(&html)?;
        Ok((html, text))
    }
}
