use thiserror::Error;

/// Structured errors surfaced by the description rendering collaborators.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error("markdown rendering failed: {message}")]
    Markdown { message: String },
    #[error("document processing failed: {message}")]
    Document { message: String },
}

/// Rewrites tag short links inside markdown source before rendering.
pub trait TagLinker: Send + Sync {
    fn link_tags(&self, markdown: &str) -> String;
}

/// Turns markdown source into display-safe HTML.
pub trait MarkdownRenderer: Send + Sync {
    fn to_html(&self, markdown: &str) -> Result<String, RenderError>;
}

/// Extracts the visible text of an HTML fragment.
pub trait TextExtractor: Send + Sync {
    fn to_text(&self, html: &str) -> Result<String, RenderError>;
}
