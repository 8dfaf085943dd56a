//! Shared domain enumerations aligned with persisted database enums.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "tag_status", rename_all = "snake_case")]
pub enum TagStatus {
    Valid,
    Invalid,
}

impl TagStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TagStatus::Valid => "valid",
            TagStatus::Invalid => "invalid",
        }
    }
}

/// The three collections published by the tag cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCollection {
    New,
    Icon,
    All,
}

impl TagCollection {
    pub fn as_str(self) -> &'static str {
        match self {
            TagCollection::New => "new_tags",
            TagCollection::Icon => "icon_tags",
            TagCollection::All => "all_tags",
        }
    }
}

impl std::fmt::Display for TagCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
