//! In-process tag store.
//!
//! Evaluates [`TagQuery`] the way the Postgres adapter does: filters are
//! ANDed, sorting is stable and the page size truncates the sorted result.
//! Transactions buffer their updates and apply them atomically on commit.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::application::repos::{
    FilterOperator, FilterValue, PageSize, PropertyFilter, RepoError, SortDirection, TagField,
    TagQuery, TagsRepo, TagsTransaction,
};
use crate::domain::entities::TagRecord;
use crate::infra::error::InfraError;

#[derive(Default)]
struct Store {
    tags: Vec<TagRecord>,
    committed_updates: Vec<i64>,
}

#[derive(Clone, Default)]
pub struct InMemoryTagsRepo {
    store: Arc<Mutex<Store>>,
}

impl InMemoryTagsRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(tags: Vec<TagRecord>) -> Self {
        Self {
            store: Arc::new(Mutex::new(Store {
                tags,
                committed_updates: Vec::new(),
            })),
        }
    }

    /// Seed a store from a JSON array of tag records.
    pub async fn from_json_file(path: &Path) -> Result<Self, InfraError> {
        let raw = tokio::fs::read_to_string(path).await?;
        let tags: Vec<TagRecord> =
            serde_json::from_str(&raw).map_err(|err| InfraError::seed(path, err.to_string()))?;
        Ok(Self::from_records(tags))
    }

    /// Insert a tag, replacing any stored tag with the same id.
    pub fn insert(&self, tag: TagRecord) {
        if let Ok(mut store) = self.lock() {
            match store.tags.iter().position(|stored| stored.id == tag.id) {
                Some(index) => store.tags[index] = tag,
                None => store.tags.push(tag),
            }
        }
    }

    pub fn get(&self, id: i64) -> Option<TagRecord> {
        self.lock()
            .ok()?
            .tags
            .iter()
            .find(|tag| tag.id == id)
            .cloned()
    }

    pub fn all(&self) -> Vec<TagRecord> {
        self.lock()
            .map(|store| store.tags.clone())
            .unwrap_or_default()
    }

    /// Ids written by committed transactions, in commit order.
    pub fn committed_updates(&self) -> Vec<i64> {
        self.lock()
            .map(|store| store.committed_updates.clone())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepoError> {
        self.store
            .lock()
            .map_err(|_| RepoError::from_persistence("in-memory tag store lock poisoned"))
    }
}

#[async_trait]
impl TagsRepo for InMemoryTagsRepo {
    async fn query_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError> {
        let store = self.lock()?;

        let mut matched = Vec::new();
        for tag in &store.tags {
            if matches_all(tag, &query.filters)? {
                matched.push(tag.clone());
            }
        }
        drop(store);

        if let Some(sort) = query.sort {
            matched.sort_by(|left, right| {
                let ordering = compare_field(left, right, sort.field);
                match sort.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        if let PageSize::Limited(limit) = query.page_size {
            matched.truncate(limit as usize);
        }

        Ok(matched)
    }

    async fn begin(&self) -> Result<Box<dyn TagsTransaction>, RepoError> {
        Ok(Box::new(InMemoryTransaction {
            store: Arc::clone(&self.store),
            pending: Vec::new(),
            active: true,
        }))
    }
}

pub struct InMemoryTransaction {
    store: Arc<Mutex<Store>>,
    pending: Vec<TagRecord>,
    active: bool,
}

impl InMemoryTransaction {
    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepoError> {
        self.store
            .lock()
            .map_err(|_| RepoError::from_persistence("in-memory tag store lock poisoned"))
    }
}

#[async_trait]
impl TagsTransaction for InMemoryTransaction {
    async fn update_tag(&mut self, tag: &TagRecord) -> Result<(), RepoError> {
        if !self.active {
            return Err(RepoError::TransactionClosed);
        }

        let exists = self.lock()?.tags.iter().any(|stored| stored.id == tag.id);
        if !exists {
            return Err(RepoError::NotFound);
        }

        self.pending.retain(|pending| pending.id != tag.id);
        self.pending.push(tag.clone());
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepoError> {
        if !self.active {
            return Err(RepoError::TransactionClosed);
        }
        self.active = false;

        let pending = std::mem::take(&mut self.pending);
        let mut guard = self.lock()?;
        let store = &mut *guard;
        for update in pending {
            let id = update.id;
            if let Some(stored) = store.tags.iter_mut().find(|stored| stored.id == id) {
                *stored = update;
                store.committed_updates.push(id);
            }
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), RepoError> {
        if !self.active {
            return Err(RepoError::TransactionClosed);
        }
        self.active = false;
        self.pending.clear();
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}

fn matches_all(tag: &TagRecord, filters: &[PropertyFilter]) -> Result<bool, RepoError> {
    for filter in filters {
        if !matches(tag, filter)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches(tag: &TagRecord, filter: &PropertyFilter) -> Result<bool, RepoError> {
    let ordering = match (filter.field, &filter.value) {
        (TagField::Id, FilterValue::Int(value)) => tag.id.cmp(value),
        (TagField::ReferenceCount, FilterValue::Int(value)) => tag.reference_count.cmp(value),
        (TagField::RandomDouble, FilterValue::Float(value)) => {
            tag.random_double.total_cmp(value)
        }
        (TagField::Title, FilterValue::Text(value)) => tag.title.as_str().cmp(value.as_str()),
        (TagField::Uri, FilterValue::Text(value)) => tag.uri.as_str().cmp(value.as_str()),
        (TagField::IconPath, FilterValue::Text(value)) => {
            tag.icon_path.as_str().cmp(value.as_str())
        }
        (TagField::Status, FilterValue::Status(value)) => {
            return match filter.operator {
                FilterOperator::Equal => Ok(tag.status == *value),
                FilterOperator::NotEqual => Ok(tag.status != *value),
                FilterOperator::GreaterThan => Err(RepoError::InvalidInput {
                    message: "status does not support ordering comparisons".to_string(),
                }),
            };
        }
        (field, value) => {
            return Err(RepoError::InvalidInput {
                message: format!("cannot compare {} with {value:?}", field.as_str()),
            });
        }
    };

    Ok(match filter.operator {
        FilterOperator::Equal => ordering == Ordering::Equal,
        FilterOperator::NotEqual => ordering != Ordering::Equal,
        FilterOperator::GreaterThan => ordering == Ordering::Greater,
    })
}

fn compare_field(left: &TagRecord, right: &TagRecord, field: TagField) -> Ordering {
    match field {
        TagField::Id => left.id.cmp(&right.id),
        TagField::Title => left.title.cmp(&right.title),
        TagField::Uri => left.uri.cmp(&right.uri),
        TagField::Status => left.status.as_str().cmp(right.status.as_str()),
        TagField::IconPath => left.icon_path.cmp(&right.icon_path),
        TagField::ReferenceCount => left.reference_count.cmp(&right.reference_count),
        TagField::RandomDouble => left.random_double.total_cmp(&right.random_double),
    }
}
