//! Tag title admission rules and URI derivation.
//!
//! A title is admitted into the public tag list when it carries no whitespace
//! and is either whitelisted or short enough and made only of characters from
//! the canonical title alphabet (CJK ideographs, ASCII word characters and
//! `,&+-.`).

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use url::form_urlencoded::byte_serialize;

use crate::domain::error::DomainError;

pub const DEFAULT_MAX_TITLE_LENGTH: usize = 9;

static TITLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\x{4e00}-\x{9fa5},A-Za-z0-9_&+\-.]+$").expect("tag title pattern must compile")
});

/// Why a title was kept out of the public tag list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleRejection {
    Whitespace,
    Pattern,
    TooLong,
}

impl TitleRejection {
    pub fn as_str(self) -> &'static str {
        match self {
            TitleRejection::Whitespace => "whitespace",
            TitleRejection::Pattern => "pattern",
            TitleRejection::TooLong => "too_long",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TitleRules {
    whitelist: HashSet<String>,
    max_length: usize,
}

impl Default for TitleRules {
    fn default() -> Self {
        Self {
            whitelist: HashSet::new(),
            max_length: DEFAULT_MAX_TITLE_LENGTH,
        }
    }
}

impl TitleRules {
    pub fn new<I, S>(whitelist: I, max_length: usize) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        if max_length == 0 {
            return Err(DomainError::validation(
                "maximum tag title length must be greater than zero",
            ));
        }

        let whitelist = whitelist
            .into_iter()
            .map(|title| title.as_ref().trim().to_lowercase())
            .filter(|title| !title.is_empty())
            .collect();

        Ok(Self {
            whitelist,
            max_length,
        })
    }

    /// Whitelist membership ignores case.
    pub fn is_whitelisted(&self, title: &str) -> bool {
        self.whitelist.contains(&title.to_lowercase())
    }

    pub fn check(&self, title: &str) -> Result<(), TitleRejection> {
        if has_whitespace(title) {
            return Err(TitleRejection::Whitespace);
        }

        if self.is_whitelisted(title) {
            return Ok(());
        }

        if !matches_title_pattern(title) {
            return Err(TitleRejection::Pattern);
        }

        if title.chars().count() > self.max_length {
            return Err(TitleRejection::TooLong);
        }

        Ok(())
    }

    pub fn admits(&self, title: &str) -> bool {
        self.check(title).is_ok()
    }
}

/// True for ordinary and full-width (U+3000) spaces as well as any other
/// Unicode whitespace.
pub fn has_whitespace(title: &str) -> bool {
    title.chars().any(char::is_whitespace)
}

pub fn matches_title_pattern(title: &str) -> bool {
    TITLE_PATTERN.is_match(title)
}

/// Form-urlencode a title into the tag URI used by legacy rows.
///
/// Every title has an encoding: spaces become `+`, so a blank title yields
/// `++` and an empty one yields an empty uri.
pub fn derive_uri(title: &str) -> String {
    byte_serialize(title.as_bytes()).collect()
}
