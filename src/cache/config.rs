//! Tag cache configuration.
//!
//! Controlled by the `[tags]` section of `tagcache.toml`.

use std::str::FromStr;

use serde::Deserialize;

use crate::domain::tags::DEFAULT_MAX_TITLE_LENGTH;

pub(crate) const DEFAULT_NEW_TAGS_COUNT: u32 = 10;

/// Upper bound rule applied by [`TagCache::icon_tags`](super::TagCache::icon_tags).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconTagBound {
    /// Historical behavior: when the request covers the whole collection the
    /// last icon tag is left out (`size - 1`).
    #[default]
    Legacy,
    /// Return `min(fetch_size, size)` tags.
    Inclusive,
}

impl IconTagBound {
    /// Exclusive end index into a non-empty collection of `size` tags.
    pub fn end(self, fetch_size: usize, size: usize) -> usize {
        match self {
            IconTagBound::Legacy => {
                if fetch_size >= size {
                    size.saturating_sub(1)
                } else {
                    fetch_size
                }
            }
            IconTagBound::Inclusive => fetch_size.min(size),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            IconTagBound::Legacy => "legacy",
            IconTagBound::Inclusive => "inclusive",
        }
    }
}

impl FromStr for IconTagBound {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(IconTagBound::Legacy),
            "inclusive" => Ok(IconTagBound::Inclusive),
            other => Err(format!(
                "unknown icon tag bound `{other}` (expected `legacy` or `inclusive`)"
            )),
        }
    }
}

/// Tag cache configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TagCacheConfig {
    /// Page size of the new-tags query.
    pub new_tags_count: u32,
    /// Boundary rule for icon tag reads.
    pub icon_tag_bound: IconTagBound,
    /// Titles admitted regardless of pattern and length (case-insensitive).
    pub title_whitelist: Vec<String>,
    /// Maximum title length, in characters, for non-whitelisted titles.
    pub max_title_length: usize,
}

impl Default for TagCacheConfig {
    fn default() -> Self {
        Self {
            new_tags_count: DEFAULT_NEW_TAGS_COUNT,
            icon_tag_bound: IconTagBound::default(),
            title_whitelist: Vec::new(),
            max_title_length: DEFAULT_MAX_TITLE_LENGTH,
        }
    }
}

impl From<&crate::config::TagSettings> for TagCacheConfig {
    fn from(settings: &crate::config::TagSettings) -> Self {
        Self {
            new_tags_count: settings.new_tags_count.get(),
            icon_tag_bound: settings.icon_tag_bound,
            title_whitelist: settings.title_whitelist.clone(),
            max_title_length: settings.max_title_length.get(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = TagCacheConfig::default();
        assert_eq!(config.new_tags_count, 10);
        assert_eq!(config.icon_tag_bound, IconTagBound::Legacy);
        assert!(config.title_whitelist.is_empty());
        assert_eq!(config.max_title_length, 9);
    }

    #[test]
    fn legacy_bound_drops_last_when_request_covers_collection() {
        let bound = IconTagBound::Legacy;
        assert_eq!(bound.end(5, 5), 4);
        assert_eq!(bound.end(10, 5), 4);
        assert_eq!(bound.end(4, 5), 4);
        assert_eq!(bound.end(2, 5), 2);
        assert_eq!(bound.end(0, 5), 0);
        assert_eq!(bound.end(1, 1), 0);
    }

    #[test]
    fn inclusive_bound_caps_at_size() {
        let bound = IconTagBound::Inclusive;
        assert_eq!(bound.end(5, 5), 5);
        assert_eq!(bound.end(10, 5), 5);
        assert_eq!(bound.end(4, 5), 4);
        assert_eq!(bound.end(0, 5), 0);
    }

    #[test]
    fn parse_bound_names() {
        assert_eq!("legacy".parse::<IconTagBound>(), Ok(IconTagBound::Legacy));
        assert_eq!(
            " Inclusive ".parse::<IconTagBound>(),
            Ok(IconTagBound::Inclusive)
        );
        assert!("fixed".parse::<IconTagBound>().is_err());
    }
}
