use comrak::{Arena, format_html, nodes::AstNode, options::Options, parse_document};

use super::types::{MarkdownRenderer, RenderError};

/// Comrak-based renderer with GFM extensions and Ammonia sanitisation.
pub struct ComrakMarkdownRenderer {
    options: Options<'static>,
    sanitizer: ammonia::Builder<'static>,
}

impl ComrakMarkdownRenderer {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            sanitizer: ammonia::Builder::default(),
        }
    }
}

impl Default for ComrakMarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for ComrakMarkdownRenderer {
    fn to_html(&self, markdown: &str) -> Result<String, RenderError> {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let rendered = render_html_stage(root, &self.options)?;
        Ok(self.sanitizer.clean(&rendered).to_string())
    }
}

fn render_html_stage<'a>(
    root: &'a AstNode<'a>,
    options: &Options<'static>,
) -> Result<String, RenderError> {
    let mut html = String::new();
    format_html(root, options, &mut html).map_err(|err| RenderError::Markdown {
        message: err.to_string(),
    })?;
    Ok(html)
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_basic_markdown() {
        let renderer = ComrakMarkdownRenderer::new();
        let html = renderer
            .to_html("**Rust** is a *language*.")
            .expect("render succeeds");

        assert!(html.contains("<strong>Rust</strong>"));
        assert!(html.contains("<em>language</em>"));
    }

    #[test]
    fn strips_script_tags() {
        let renderer = ComrakMarkdownRenderer::new();
        let html = renderer
            .to_html("hello <script>alert(1)</script>")
            .expect("render succeeds");

        assert!(!html.contains("<script"));
        assert!(html.contains("hello"));
    }

    #[test]
    fn renders_links() {
        let renderer = ComrakMarkdownRenderer::new();
        let html = renderer
            .to_html("[Rust](/tag/Rust)")
            .expect("render succeeds");

        assert!(html.contains("href=\"/tag/Rust\""));
    }
}
