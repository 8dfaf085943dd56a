//! Copy-on-write publication slot for one tag collection.

use std::sync::{Arc, RwLock};

use tokio::sync::{Mutex, MutexGuard};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::snapshot";

/// Holds the currently published collection behind a pointer swap.
///
/// Readers clone the `Arc` under a short read lock and never observe a
/// half-built collection. Reloads of the same slot are serialized through
/// `reload`.
pub(crate) struct Published<T> {
    current: RwLock<Arc<[T]>>,
    reload: Mutex<()>,
}

impl<T> Published<T> {
    pub(crate) fn new() -> Self {
        Self {
            current: RwLock::new(Arc::from(Vec::new())),
            reload: Mutex::new(()),
        }
    }

    pub(crate) fn load(&self) -> Arc<[T]> {
        Arc::clone(&rw_read(&self.current, SOURCE, "load"))
    }

    /// Publish `items` as the new collection and return its length.
    pub(crate) fn replace(&self, items: Vec<T>) -> usize {
        let next: Arc<[T]> = Arc::from(items);
        let len = next.len();
        let previous = std::mem::replace(&mut *rw_write(&self.current, SOURCE, "replace"), next);
        drop(previous);
        len
    }

    pub(crate) async fn reload_guard(&self) -> MutexGuard<'_, ()> {
        self.reload.lock().await
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;

    #[test]
    fn starts_empty() {
        let slot: Published<u32> = Published::new();
        assert!(slot.load().is_empty());
    }

    #[test]
    fn replace_swaps_whole_collection() {
        let slot = Published::new();
        slot.replace(vec![1, 2, 3]);
        let before = slot.load();

        assert_eq!(slot.replace(vec![9]), 1);

        assert_eq!(&*before, &[1, 2, 3]);
        assert_eq!(&*slot.load(), &[9]);
    }

    #[test]
    fn recovers_from_poisoned_lock() {
        let slot = Published::new();
        slot.replace(vec!["a"]);

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = slot
                .current
                .write()
                .expect("snapshot lock should be acquired");
            panic!("poison snapshot lock");
        }));

        assert_eq!(&*slot.load(), &["a"]);
        slot.replace(vec!["b"]);
        assert_eq!(&*slot.load(), &["b"]);
    }
}
