//! Single-flight bookkeeping for background refreshes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::CacheKey;

/// The set of keys with a background refresh in flight.
///
/// Cloning shares the same set. The lock is never held across an `.await`,
/// so a blocking mutex is enough even on the multi-threaded runtime.
#[derive(Debug, Clone, Default)]
pub struct RevalidationTracker {
    in_flight: Arc<Mutex<HashSet<CacheKey>>>,
}

impl RevalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn keys(&self) -> MutexGuard<'_, HashSet<CacheKey>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `key`. Returns `false` without changing anything if it is
    /// already claimed.
    pub fn try_begin(&self, key: &CacheKey) -> bool {
        let mut keys = self.keys();
        if keys.contains(key) {
            return false;
        }
        keys.insert(key.clone())
    }

    /// Releases `key`. Releasing an unclaimed key is a no-op.
    pub fn complete(&self, key: &CacheKey) {
        self.keys().remove(key);
    }

    /// Claims `key` and returns a guard that releases it when dropped, so the
    /// claim is cleared on every exit path of the refresh task, panics included.
    pub fn begin(&self, key: &CacheKey) -> Option<RevalidationGuard> {
        self.try_begin(key).then(|| RevalidationGuard {
            tracker: self.clone(),
            key: key.clone(),
        })
    }

    /// Returns `true` while a refresh for `key` is in flight.
    pub fn is_revalidating(&self, key: &CacheKey) -> bool {
        self.keys().contains(key)
    }

    /// Number of refreshes currently in flight.
    pub fn len(&self) -> usize {
        self.keys().len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }
}

/// Releases its key from the tracker on drop.
#[derive(Debug)]
pub struct RevalidationGuard {
    tracker: RevalidationTracker,
    key: CacheKey,
}

impl RevalidationGuard {
    pub fn key(&self) -> &CacheKey {
        &self.key
    }
}

impl Drop for RevalidationGuard {
    fn drop(&mut self) {
        self.tracker.complete(&self.key);
    }
}
