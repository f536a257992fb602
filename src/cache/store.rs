//! The pluggable storage contract consumed by the cache layer.
//!
//! A store is a TTL-expiring key-value map addressed by `(segment, id)`.
//! Expiry is the store's job; the cache layer only hands over a TTL with
//! every write. Items are plain JSON values so one store can back any
//! number of caches.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Errors reported by a [`CacheStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store has not been started")]
    NotReady,

    #[error("cache entry could not be (de)serialized: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Boxed future returned by every [`CacheStore`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// A stored item together with its expiry bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub item: serde_json::Value,
    /// Lifetime the item was written with.
    pub ttl: Duration,
    /// Unix milliseconds at which the item was written.
    pub stored_at: u64,
}

impl StoredItem {
    /// Unix milliseconds at which the item expires.
    pub fn expires_at(&self) -> u64 {
        let ttl_ms = u64::try_from(self.ttl.as_millis()).unwrap_or(u64::MAX);
        self.stored_at.saturating_add(ttl_ms)
    }
}

/// Async, TTL-expiring key-value storage.
///
/// # Contract
///
/// - [`start`](Self::start) must resolve before the store is used; stores that
///   need no setup resolve immediately.
/// - [`get`](Self::get) resolves to `None` for missing or expired items.
/// - [`set`](Self::set) fully replaces any existing item under the same id.
/// - [`drop_entry`](Self::drop_entry) is a no-op for missing ids.
pub trait CacheStore: Send + Sync {
    fn start(&self) -> StoreFuture<'_, ()>;

    fn get<'a>(&'a self, segment: &'a str, id: &'a str) -> StoreFuture<'a, Option<StoredItem>>;

    fn set<'a>(
        &'a self,
        segment: &'a str,
        id: &'a str,
        item: serde_json::Value,
        ttl: Duration,
    ) -> StoreFuture<'a, ()>;

    fn drop_entry<'a>(&'a self, segment: &'a str, id: &'a str) -> StoreFuture<'a, ()>;

    /// Returns `true` once [`start`](Self::start) has completed.
    fn is_ready(&self) -> bool {
        true
    }
}
