#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tagcache::application::render::DescriptionRenderer;
use tagcache::application::repos::{RepoError, TagQuery, TagsRepo, TagsTransaction};
use tagcache::cache::{TagCache, TagCacheConfig};
use tagcache::domain::entities::TagRecord;
use tagcache::domain::types::TagStatus;
use tagcache::infra::memory::InMemoryTagsRepo;

pub fn tag(id: i64, title: &str) -> TagRecord {
    TagRecord {
        id,
        title: title.to_string(),
        uri: title.to_string(),
        css: String::new(),
        description: String::new(),
        status: TagStatus::Valid,
        icon_path: String::new(),
        reference_count: 0,
        random_double: 0.5,
    }
}

pub fn referenced(id: i64, title: &str, reference_count: i64) -> TagRecord {
    TagRecord {
        reference_count,
        ..tag(id, title)
    }
}

pub fn icon(id: i64, title: &str, random_double: f64) -> TagRecord {
    TagRecord {
        icon_path: format!("icons/{id}.png"),
        random_double,
        ..tag(id, title)
    }
}

pub fn legacy(id: i64, title: &str) -> TagRecord {
    TagRecord {
        uri: String::new(),
        css: "legacy-style".to_string(),
        ..tag(id, title)
    }
}

pub fn cache_with(repo: Arc<dyn TagsRepo>, config: TagCacheConfig) -> TagCache {
    TagCache::new(config, repo, DescriptionRenderer::standard("/tag/")).expect("valid cache")
}

pub fn default_cache(repo: Arc<dyn TagsRepo>) -> TagCache {
    cache_with(repo, TagCacheConfig::default())
}

#[derive(Default)]
pub struct FaultState {
    fail_queries: AtomicBool,
    /// 1-based index of the update call that fails; 0 disables the fault.
    fail_update_at: AtomicUsize,
    /// A failing update also closes its transaction.
    close_on_failure: AtomicBool,
    updates: AtomicUsize,
    rollbacks: AtomicUsize,
    commits: AtomicUsize,
}

/// Wraps the in-memory store and injects repository failures on demand.
#[derive(Clone)]
pub struct FaultyTagsRepo {
    pub inner: InMemoryTagsRepo,
    state: Arc<FaultState>,
}

impl FaultyTagsRepo {
    pub fn new(tags: Vec<TagRecord>) -> Self {
        Self {
            inner: InMemoryTagsRepo::from_records(tags),
            state: Arc::new(FaultState::default()),
        }
    }

    pub fn fail_queries(&self, fail: bool) {
        self.state.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_update_at(&self, call: usize) {
        self.state.updates.store(0, Ordering::SeqCst);
        self.state.fail_update_at.store(call, Ordering::SeqCst);
    }

    pub fn close_on_failure(&self, close: bool) {
        self.state.close_on_failure.store(close, Ordering::SeqCst);
    }

    pub fn rollbacks(&self) -> usize {
        self.state.rollbacks.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.state.commits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagsRepo for FaultyTagsRepo {
    async fn query_tags(&self, query: &TagQuery) -> Result<Vec<TagRecord>, RepoError> {
        if self.state.fail_queries.load(Ordering::SeqCst) {
            return Err(RepoError::from_persistence("connection reset"));
        }
        self.inner.query_tags(query).await
    }

    async fn begin(&self) -> Result<Box<dyn TagsTransaction>, RepoError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTransaction {
            inner: Some(inner),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FaultyTransaction {
    inner: Option<Box<dyn TagsTransaction>>,
    state: Arc<FaultState>,
}

#[async_trait]
impl TagsTransaction for FaultyTransaction {
    async fn update_tag(&mut self, tag: &TagRecord) -> Result<(), RepoError> {
        let call = self.state.updates.fetch_add(1, Ordering::SeqCst) + 1;
        if call == self.state.fail_update_at.load(Ordering::SeqCst) {
            if self.state.close_on_failure.load(Ordering::SeqCst) {
                if let Some(inner) = self.inner.take() {
                    inner.rollback().await?;
                }
            }
            return Err(RepoError::from_persistence("deadlock detected"));
        }

        match self.inner.as_mut() {
            Some(inner) => inner.update_tag(tag).await,
            None => Err(RepoError::TransactionClosed),
        }
    }

    async fn commit(mut self: Box<Self>) -> Result<(), RepoError> {
        let inner = self.inner.take().ok_or(RepoError::TransactionClosed)?;
        inner.commit().await?;
        self.state.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<(), RepoError> {
        let inner = self.inner.take().ok_or(RepoError::TransactionClosed)?;
        inner.rollback().await?;
        self.state.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.is_active())
    }
}
