//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};

use crate::domain::types::TagStatus;

/// A tag row as stored in the backing store.
///
/// `id` grows with creation time, so ordering by it descending yields the
/// most recently created tags first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagRecord {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub description: String,
    pub status: TagStatus,
    #[serde(default)]
    pub icon_path: String,
    #[serde(default)]
    pub reference_count: i64,
    #[serde(default)]
    pub random_double: f64,
}

impl TagRecord {
    pub fn is_valid(&self) -> bool {
        self.status == TagStatus::Valid
    }
}

/// A tag prepared for display.
///
/// `tag.description` holds rendered HTML whenever the stored markdown was not
/// blank. None of the derived fields are ever written back to the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedTag {
    pub tag: TagRecord,
    pub description_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_lower_case: Option<String>,
}

impl CachedTag {
    pub fn title(&self) -> &str {
        &self.tag.title
    }
}
