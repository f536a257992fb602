//! In-memory [`CacheStore`] with lazy TTL expiry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::debug;

use super::entry::current_timestamp_ms;
use super::store::{CacheStore, StoreError, StoreFuture, StoredItem};

/// A process-local store backed by nested hash maps.
///
/// Expired items are dropped when read, or in bulk through
/// [`purge_expired`](Self::purge_expired). Every operation fails with
/// [`StoreError::NotReady`] until [`start`](CacheStore::start) has run.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ready: AtomicBool,
    segments: RwLock<HashMap<String, HashMap<String, StoredItem>>>,
}

impl MemoryStore {
    /// Creates an empty, not yet started store.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_ready(&self) -> Result<(), StoreError> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::NotReady)
        }
    }

    /// Number of items currently held, expired ones included.
    pub async fn len(&self) -> usize {
        self.segments.read().await.values().map(HashMap::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Removes every expired item and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = current_timestamp_ms();
        let mut segments = self.segments.write().await;
        let mut removed = 0;
        for items in segments.values_mut() {
            let before = items.len();
            items.retain(|_, item| item.expires_at() > now);
            removed += before - items.len();
        }
        segments.retain(|_, items| !items.is_empty());
        removed
    }
}

impl CacheStore for MemoryStore {
    fn start(&self) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.ready.store(true, Ordering::Release);
            Ok(())
        })
    }

    fn get<'a>(&'a self, segment: &'a str, id: &'a str) -> StoreFuture<'a, Option<StoredItem>> {
        Box::pin(async move {
            self.ensure_ready()?;
            let now = current_timestamp_ms();

            {
                let segments = self.segments.read().await;
                match segments.get(segment).and_then(|items| items.get(id)) {
                    None => return Ok(None),
                    Some(item) if item.expires_at() > now => return Ok(Some(item.clone())),
                    Some(_) => {}
                }
            }

            let mut segments = self.segments.write().await;
            if let Some(items) = segments.get_mut(segment) {
                // Re-check under the write lock; a fresh write may have landed.
                if items.get(id).is_some_and(|item| item.expires_at() <= now) {
                    items.remove(id);
                    debug!(segment, id, "expired item dropped on read");
                }
            }
            Ok(None)
        })
    }

    fn set<'a>(
        &'a self,
        segment: &'a str,
        id: &'a str,
        item: serde_json::Value,
        ttl: Duration,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.ensure_ready()?;
            if ttl.is_zero() {
                return Ok(());
            }
            let stored = StoredItem {
                item,
                ttl,
                stored_at: current_timestamp_ms(),
            };
            self.segments
                .write()
                .await
                .entry(segment.to_owned())
                .or_default()
                .insert(id.to_owned(), stored);
            Ok(())
        })
    }

    fn drop_entry<'a>(&'a self, segment: &'a str, id: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            self.ensure_ready()?;
            if let Some(items) = self.segments.write().await.get_mut(segment) {
                items.remove(id);
            }
            Ok(())
        })
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}
