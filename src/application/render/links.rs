use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::domain::tags::derive_uri;

use super::types::TagLinker;

pub const DEFAULT_TAG_LINK_BASE: &str = "/tag/";

static SHORT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#([\x{4e00}-\x{9fa5},A-Za-z0-9_&+\-.]+)#").expect("short link pattern must compile")
});

/// Rewrites `#Title#` short links into markdown links pointing at the tag page.
#[derive(Debug, Clone)]
pub struct ShortLinkTagLinker {
    base: String,
}

impl ShortLinkTagLinker {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl Default for ShortLinkTagLinker {
    fn default() -> Self {
        Self::new(DEFAULT_TAG_LINK_BASE)
    }
}

impl TagLinker for ShortLinkTagLinker {
    fn link_tags(&self, markdown: &str) -> String {
        SHORT_LINK
            .replace_all(markdown, |caps: &Captures<'_>| {
                let title = &caps[1];
                format!("[{title}]({}{})", self.base, derive_uri(title))
            })
            .into_owned()
    }
}
