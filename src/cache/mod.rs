//! `Cache-Control` aware response caching for client pipelines.
//!
//! ## Pieces
//!
//! - [`cache_control`]: parses the directives the cache acts on.
//! - [`CacheKey`]: canonical request identity (URL plus sorted query).
//! - [`freshness`]: admission rules and TTL arithmetic.
//! - [`CachedEntry`]: the record written into a store.
//! - [`RevalidationTracker`]: single-flight guard for background refreshes.
//! - [`CacheStore`] / [`MemoryStore`]: pluggable TTL storage.
//! - [`CachingMiddleware`]: ties it all into the middleware pipeline.

pub mod cache_control;
mod entry;
pub mod freshness;
mod key;
mod memory;
mod middleware;
mod revalidation;
mod store;

pub use entry::{CachedEntry, current_timestamp_ms};
pub use key::CacheKey;
pub use memory::MemoryStore;
pub use middleware::{CachingMiddleware, RefreshFn, RevalidationEvent, RevalidationOutcome};
pub use revalidation::{RevalidationGuard, RevalidationTracker};
pub use store::{CacheStore, StoreError, StoreFuture, StoredItem};
