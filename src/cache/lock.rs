//! Poison-tolerant `RwLock` access for published snapshots.
//!
//! The locks only guard an `Arc` pointer to an immutable slice that is swapped
//! in one assignment, so a panicking holder cannot leave a half-written value
//! behind and the inner guard is safe to reuse.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn rw_read<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    match lock.read() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.read",
                result = "poisoned_recovered",
                hint = "serving the last published snapshot",
                "Recovered from poisoned tag cache lock"
            );
            poisoned.into_inner()
        }
    }
}

pub(crate) fn rw_write<'a, T>(
    lock: &'a RwLock<T>,
    target: &'static str,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    match lock.write() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                op,
                target_module = target,
                lock_kind = "rwlock.write",
                result = "poisoned_recovered",
                hint = "replacing the snapshot left behind by a panicked writer",
                "Recovered from poisoned tag cache lock"
            );
            poisoned.into_inner()
        }
    }
}
