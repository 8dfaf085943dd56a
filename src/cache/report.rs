//! Observable outcome of a loader run.

use serde_json::{Value, json};
use thiserror::Error;

use crate::application::repos::RepoError;
use crate::domain::types::TagCollection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Query,
    Migrate,
    Randomize,
}

impl LoadStage {
    pub fn as_str(self) -> &'static str {
        match self {
            LoadStage::Query => "query",
            LoadStage::Migrate => "migrate",
            LoadStage::Randomize => "randomize",
        }
    }
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum TagCacheError {
    #[error("tag query failed: {0}")]
    Query(RepoError),
    #[error("legacy tag migration failed: {0}")]
    Migration(#[from] MigrationError),
    #[error("icon tag re-randomization failed: {0}")]
    Randomize(RepoError),
}

impl TagCacheError {
    pub fn stage(&self) -> LoadStage {
        match self {
            TagCacheError::Query(_) => LoadStage::Query,
            TagCacheError::Migration(_) => LoadStage::Migrate,
            TagCacheError::Randomize(_) => LoadStage::Randomize,
        }
    }
}

/// Result of one loader invocation.
///
/// `published` carries the size of the newly published collection, or `None`
/// when the previous collection was kept. Side-effect failures that did not
/// prevent publication are listed in `errors` next to a `Some` count.
#[derive(Debug)]
pub struct LoadReport {
    pub collection: TagCollection,
    pub published: Option<usize>,
    pub errors: Vec<TagCacheError>,
}

impl LoadReport {
    pub(crate) fn published(collection: TagCollection, count: usize) -> Self {
        Self {
            collection,
            published: Some(count),
            errors: Vec::new(),
        }
    }

    pub(crate) fn failed(collection: TagCollection, error: TagCacheError) -> Self {
        Self {
            collection,
            published: None,
            errors: vec![error],
        }
    }

    pub fn is_published(&self) -> bool {
        self.published.is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.is_published() && self.errors.is_empty()
    }

    pub fn has_stage_error(&self, stage: LoadStage) -> bool {
        self.errors.iter().any(|error| error.stage() == stage)
    }

    pub fn result_label(&self) -> &'static str {
        match (self.is_published(), self.errors.is_empty()) {
            (true, true) => "ok",
            (true, false) => "partial",
            (false, _) => "failed",
        }
    }

    pub fn to_json(&self) -> Value {
        json!({
            "collection": self.collection.as_str(),
            "result": self.result_label(),
            "published": self.published,
            "errors": self
                .errors
                .iter()
                .map(|error| json!({ "stage": error.stage().as_str(), "message": error.to_string() }))
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_outcome() {
        let ok = LoadReport::published(TagCollection::New, 3);
        assert_eq!(ok.result_label(), "ok");
        assert!(ok.is_clean());

        let mut partial = LoadReport::published(TagCollection::Icon, 2);
        partial
            .errors
            .push(TagCacheError::Randomize(RepoError::TransactionClosed));
        assert_eq!(partial.result_label(), "partial");
        assert!(partial.has_stage_error(LoadStage::Randomize));
        assert!(!partial.is_clean());

        let failed = LoadReport::failed(
            TagCollection::All,
            TagCacheError::Query(RepoError::Persistence("down".to_string())),
        );
        assert_eq!(failed.result_label(), "failed");
        assert!(!failed.is_published());
    }

    #[test]
    fn json_summary_lists_errors() {
        let failed = LoadReport::failed(
            TagCollection::All,
            TagCacheError::Migration(MigrationError::Repo(RepoError::TransactionClosed)),
        );
        let value = failed.to_json();

        assert_eq!(value["collection"], "all_tags");
        assert_eq!(value["result"], "failed");
        assert!(value["published"].is_null());
        assert_eq!(value["errors"][0]["stage"], "migrate");
    }
}
