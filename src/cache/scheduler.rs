//! Periodic reload driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::tags::TagCache;

/// Reloads every tag collection on a fixed cadence.
///
/// The first tick is skipped; callers are expected to warm the cache before
/// spawning the scheduler.
pub struct ReloadScheduler {
    cache: Arc<TagCache>,
    cadence: Duration,
}

impl ReloadScheduler {
    pub fn new(cache: Arc<TagCache>, cadence: Duration) -> Self {
        Self { cache, cadence }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.cadence);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let reports = self.cache.reload_all().await;
                debug!(
                    failed = reports.iter().filter(|report| !report.is_clean()).count(),
                    "Scheduled tag reload finished"
                );
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::render::DescriptionRenderer;
    use crate::cache::TagCacheConfig;
    use crate::domain::entities::TagRecord;
    use crate::domain::types::TagStatus;
    use crate::infra::memory::InMemoryTagsRepo;

    #[tokio::test]
    async fn scheduled_reload_picks_up_store_changes() {
        let repo = Arc::new(InMemoryTagsRepo::new());
        let cache = Arc::new(
            TagCache::new(
                TagCacheConfig::default(),
                repo.clone(),
                DescriptionRenderer::standard("/tag/"),
            )
            .expect("valid cache"),
        );

        cache.reload_all().await;
        assert!(cache.tags().is_empty());

        repo.insert(TagRecord {
            id: 1,
            title: "Rust".to_string(),
            uri: "Rust".to_string(),
            css: String::new(),
            description: String::new(),
            status: TagStatus::Valid,
            icon_path: String::new(),
            reference_count: 1,
            random_double: 0.1,
        });

        let handle = ReloadScheduler::new(Arc::clone(&cache), Duration::from_millis(10)).spawn();

        let mut seen = false;
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if cache.tags().len() == 1 && cache.new_tags().len() == 1 {
                seen = true;
                break;
            }
        }

        handle.abort();
        let _ = handle.await;

        assert!(seen, "scheduled reload should publish the inserted tag");
    }
}
