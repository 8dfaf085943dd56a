//! The tag cache: three published collections and the loaders that refresh them.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::{debug, error, info, instrument, warn};

use crate::application::render::DescriptionRenderer;
use crate::application::repos::{
    FilterOperator, PageSize, PropertyFilter, RepoError, SortDirection, TagField, TagQuery,
    TagsRepo, TagsTransaction,
};
use crate::domain::entities::{CachedTag, TagRecord};
use crate::domain::error::DomainError;
use crate::domain::tags::{TitleRules, derive_uri};
use crate::domain::types::{TagCollection, TagStatus};

use super::config::TagCacheConfig;
use super::report::{LoadReport, MigrationError, TagCacheError};
use super::snapshot::Published;

const METRIC_LOAD_TOTAL: &str = "tagcache_load_total";
const METRIC_COLLECTION_SIZE: &str = "tagcache_collection_size";
const METRIC_LOAD_MS: &str = "tagcache_load_ms";

/// In-process cache of new, icon and all tags.
///
/// Loaders never return errors: a failed refresh keeps the last published
/// collection and describes the failure in its [`LoadReport`]. Readers always
/// get a copy of a complete snapshot.
pub struct TagCache {
    config: TagCacheConfig,
    rules: TitleRules,
    repo: Arc<dyn TagsRepo>,
    renderer: DescriptionRenderer,
    new_tags: Published<TagRecord>,
    icon_tags: Published<CachedTag>,
    all_tags: Published<CachedTag>,
}

impl TagCache {
    pub fn new(
        config: TagCacheConfig,
        repo: Arc<dyn TagsRepo>,
        renderer: DescriptionRenderer,
    ) -> Result<Self, DomainError> {
        let rules = TitleRules::new(&config.title_whitelist, config.max_title_length)?;

        Ok(Self {
            config,
            rules,
            repo,
            renderer,
            new_tags: Published::new(),
            icon_tags: Published::new(),
            all_tags: Published::new(),
        })
    }

    // ========================================================================
    // Readers
    // ========================================================================

    /// Most recently created tags that are in use, newest first.
    pub fn new_tags(&self) -> Vec<TagRecord> {
        self.new_tags.load().to_vec()
    }

    /// Up to `fetch_size` icon tags from the head of the randomized collection.
    ///
    /// The upper bound follows [`IconTagBound`](super::IconTagBound); with the
    /// default legacy rule a request covering the whole collection returns one
    /// tag fewer than the collection holds.
    pub fn icon_tags(&self, fetch_size: usize) -> Vec<CachedTag> {
        let snapshot = self.icon_tags.load();
        if snapshot.is_empty() {
            return Vec::new();
        }

        let end = self.config.icon_tag_bound.end(fetch_size, snapshot.len());
        snapshot[..end].to_vec()
    }

    /// All admitted tags sorted by lower-cased title.
    pub fn tags(&self) -> Vec<CachedTag> {
        self.all_tags.load().to_vec()
    }

    // ========================================================================
    // Loaders
    // ========================================================================

    /// Run every loader once, in new, icon, all order.
    pub async fn reload_all(&self) -> Vec<LoadReport> {
        vec![
            self.load_new_tags().await,
            self.load_icon_tags().await,
            self.load_all_tags().await,
        ]
    }

    pub async fn reload(&self, collection: TagCollection) -> LoadReport {
        match collection {
            TagCollection::New => self.load_new_tags().await,
            TagCollection::Icon => self.load_icon_tags().await,
            TagCollection::All => self.load_all_tags().await,
        }
    }

    #[instrument(skip(self))]
    pub async fn load_new_tags(&self) -> LoadReport {
        let _reload = self.new_tags.reload_guard().await;
        let started_at = Instant::now();

        let query = TagQuery::new()
            .filter(PropertyFilter::new(
                TagField::ReferenceCount,
                FilterOperator::GreaterThan,
                0_i64,
            ))
            .sort(TagField::Id, SortDirection::Descending)
            .page_size(PageSize::Limited(self.config.new_tags_count));

        let report = match self.repo.query_tags(&query).await {
            Ok(tags) => {
                let count = self.new_tags.replace(tags);
                LoadReport::published(TagCollection::New, count)
            }
            Err(err) => query_failed(TagCollection::New, &query, err),
        };

        finish(report, started_at)
    }

    #[instrument(skip(self))]
    pub async fn load_icon_tags(&self) -> LoadReport {
        let _reload = self.icon_tags.reload_guard().await;
        let started_at = Instant::now();

        let query = TagQuery::new()
            .filter(PropertyFilter::new(
                TagField::IconPath,
                FilterOperator::NotEqual,
                "",
            ))
            .filter(PropertyFilter::new(
                TagField::Status,
                FilterOperator::Equal,
                TagStatus::Valid,
            ))
            .sort(TagField::RandomDouble, SortDirection::Ascending)
            .page_size(PageSize::Unbounded);

        let persisted = match self.repo.query_tags(&query).await {
            Ok(tags) => tags,
            Err(err) => {
                return finish(query_failed(TagCollection::Icon, &query, err), started_at);
            }
        };

        let published: Vec<CachedTag> = persisted
            .iter()
            .cloned()
            .map(|tag| self.renderer.render(tag))
            .collect();

        let count = self.icon_tags.replace(published);
        let mut report = LoadReport::published(TagCollection::Icon, count);

        if let Err(err) = self.rerandomize(persisted).await {
            error!(
                collection = TagCollection::Icon.as_str(),
                stage = "randomize",
                error = %err,
                "Updating icon tag random keys failed"
            );
            report.errors.push(TagCacheError::Randomize(err));
        }

        finish(report, started_at)
    }

    #[instrument(skip(self))]
    pub async fn load_all_tags(&self) -> LoadReport {
        let _reload = self.all_tags.reload_guard().await;
        let started_at = Instant::now();

        let query = TagQuery::new()
            .filter(PropertyFilter::new(
                TagField::Status,
                FilterOperator::Equal,
                TagStatus::Valid,
            ))
            .page_size(PageSize::Unbounded);

        let mut fetched = match self.repo.query_tags(&query).await {
            Ok(tags) => tags,
            Err(err) => {
                return finish(query_failed(TagCollection::All, &query, err), started_at);
            }
        };

        let migration = self.migrate_legacy_uris(&mut fetched).await;

        let mut admitted: Vec<CachedTag> = fetched
            .into_iter()
            .filter(|tag| self.admit(tag))
            .map(|tag| {
                let title_lower_case = tag.title.to_lowercase();
                let mut cached = self.renderer.render(tag);
                cached.title_lower_case = Some(title_lower_case);
                cached
            })
            .collect();

        admitted.sort_by(|left, right| {
            sort_key(left)
                .encode_utf16()
                .cmp(sort_key(right).encode_utf16())
        });

        let count = self.all_tags.replace(admitted);
        let mut report = LoadReport::published(TagCollection::All, count);

        if let Err(err) = migration {
            error!(
                collection = TagCollection::All.as_str(),
                stage = "migrate",
                error = %err,
                "Migrating legacy tag data failed"
            );
            report.errors.push(TagCacheError::Migration(err));
        }

        finish(report, started_at)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn admit(&self, tag: &TagRecord) -> bool {
        match self.rules.check(&tag.title) {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    tag_id = tag.id,
                    title = %tag.title,
                    reason = reason.as_str(),
                    "Tag excluded from all tags"
                );
                false
            }
        }
    }

    /// Assign a fresh sampling key to every fetched icon tag in one transaction.
    async fn rerandomize(&self, persisted: Vec<TagRecord>) -> Result<usize, RepoError> {
        let mut transaction = self.repo.begin().await?;
        let mut updated = 0;

        for mut tag in persisted {
            tag.random_double = fastrand::f64();
            if let Err(err) = transaction.update_tag(&tag).await {
                rollback_if_active(transaction, TagCollection::Icon).await;
                return Err(err);
            }
            updated += 1;
        }

        transaction.commit().await?;
        Ok(updated)
    }

    /// Give legacy rows without a uri one derived from their title.
    ///
    /// The derived values stay on `tags` even when the transaction is rolled
    /// back, so the published collection carries them either way.
    async fn migrate_legacy_uris(&self, tags: &mut [TagRecord]) -> Result<usize, MigrationError> {
        if !tags.iter().any(|tag| tag.uri.trim().is_empty()) {
            return Ok(0);
        }

        let mut transaction = self.repo.begin().await?;
        let mut migrated = 0;

        for tag in tags.iter_mut() {
            if !tag.uri.trim().is_empty() {
                continue;
            }

            tag.uri = derive_uri(&tag.title);
            tag.css.clear();

            if let Err(err) = transaction.update_tag(tag).await {
                rollback_if_active(transaction, TagCollection::All).await;
                return Err(err.into());
            }

            info!(tag_id = tag.id, title = %tag.title, uri = %tag.uri, "Migrated tag");
            migrated += 1;
        }

        transaction.commit().await?;
        Ok(migrated)
    }
}

/// Lower-cased title, compared by UTF-16 code units so astral characters sort
/// below U+E000..U+FFFF.
fn sort_key(tag: &CachedTag) -> &str {
    tag.title_lower_case.as_deref().unwrap_or(&tag.tag.title)
}

fn query_failed(collection: TagCollection, query: &TagQuery, err: RepoError) -> LoadReport {
    error!(
        collection = collection.as_str(),
        stage = "query",
        query = %query,
        error = %err,
        "Loading tags failed; keeping previous collection"
    );
    LoadReport::failed(collection, TagCacheError::Query(err))
}

async fn rollback_if_active(transaction: Box<dyn TagsTransaction>, collection: TagCollection) {
    if !transaction.is_active() {
        return;
    }

    if let Err(err) = transaction.rollback().await {
        warn!(
            collection = collection.as_str(),
            error = %err,
            "Rolling back tag transaction failed"
        );
    }
}

fn finish(report: LoadReport, started_at: Instant) -> LoadReport {
    let collection = report.collection.as_str();
    let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;

    counter!(
        METRIC_LOAD_TOTAL,
        "collection" => collection,
        "result" => report.result_label()
    )
    .increment(1);
    if let Some(count) = report.published {
        gauge!(METRIC_COLLECTION_SIZE, "collection" => collection).set(count as f64);
    }
    histogram!(METRIC_LOAD_MS, "collection" => collection).record(elapsed_ms);

    info!(
        collection,
        result = report.result_label(),
        published = report.published,
        errors = report.errors.len(),
        elapsed_ms,
        "Tag collection load finished"
    );

    report
}
