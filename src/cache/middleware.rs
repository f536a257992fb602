//! Response caching middleware.
//!
//! Per request the middleware looks the request's [`CacheKey`] up in the
//! store. A hit short-circuits the pipeline with the cached response; a miss
//! forwards to the next stage and admits the fetched response according to its
//! `Cache-Control` header.
//!
//! With stale-while-revalidate enabled, a hit past its refresh point is still
//! answered from cache while one background task per key fetches a
//! replacement. Refresh results are published on a broadcast channel.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OnceCell, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::entry::{CachedEntry, current_timestamp_ms};
use super::freshness::{self, Admission};
use super::revalidation::RevalidationTracker;
use super::store::{CacheStore, StoreError};
use super::CacheKey;
use crate::config::CacheConfig;
use crate::middleware::{FetchError, Middleware, Next, PipelineFuture};
use crate::{Request, Response};

/// Capacity of the revalidation event channel; slow subscribers lag, they
/// never block a refresh.
const EVENT_CAPACITY: usize = 64;

/// Fetches a replacement response for a key during background revalidation.
pub type RefreshFn = Arc<dyn Fn(CacheKey) -> PipelineFuture + Send + Sync>;

/// What happened to one background refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationOutcome {
    /// A new entry was stored with the given lifetime.
    Refreshed { ttl: Duration },
    /// The refresh returned an error status or a stale response; nothing was stored.
    Discarded { status: u16 },
    /// The refresh or the store write failed; the stale entry is left alone.
    Failed { reason: String },
}

/// Published once per finished background refresh, after its key has been
/// released from the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevalidationEvent {
    pub key: CacheKey,
    pub outcome: RevalidationOutcome,
}

/// Middleware serving responses from a [`CacheStore`].
///
/// Cloning is cheap and clones share the store, the revalidation tracker and
/// the event channel.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use rttp_cache::cache::{CachingMiddleware, MemoryStore};
/// use rttp_cache::{CacheConfig, Client, Request, Response, StatusCode};
/// use rttp_cache::middleware::FetchError;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = CachingMiddleware::new(
///     Arc::new(MemoryStore::new()),
///     CacheConfig::new().stale_while_revalidate(true),
/// );
/// cache.start().await?;
///
/// let client = Client::new(|request: Request| async move {
///     Ok::<_, FetchError>(Response::new(StatusCode::OK).url(request.href()))
/// })
/// .with_middleware(cache);
///
/// let response = client.execute(Request::get("http://www.example.com/path")).await?;
/// assert!(!response.is_from_cache());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CachingMiddleware {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    refresh: Option<RefreshFn>,
    tracker: RevalidationTracker,
    events: broadcast::Sender<RevalidationEvent>,
    started: Arc<OnceCell<()>>,
}

impl CachingMiddleware {
    /// Creates the middleware.
    ///
    /// The store is started on the first request unless [`start`](Self::start)
    /// was awaited earlier. Awaiting `start` up front surfaces a failing store
    /// before traffic arrives.
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            config,
            refresh: None,
            tracker: RevalidationTracker::new(),
            events,
            started: Arc::new(OnceCell::new()),
        }
    }

    /// Sets the function used to fetch replacements during background
    /// revalidation. Without one, the rest of the pipeline is replayed with
    /// the request that hit the stale entry.
    #[must_use]
    pub fn refresh<F, Fut>(mut self, refresh: F) -> Self
    where
        F: Fn(CacheKey) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Response, FetchError>> + Send + 'static,
    {
        self.refresh = Some(Arc::new(move |key: CacheKey| -> PipelineFuture {
            Box::pin(refresh(key))
        }));
        self
    }

    /// Starts the underlying store.
    ///
    /// Runs at most once per middleware and its clones. A failed start is not
    /// remembered, so the next call or request tries again.
    ///
    /// # Errors
    ///
    /// Returns the [`StoreError`] reported by [`CacheStore::start`].
    pub async fn start(&self) -> Result<(), StoreError> {
        self.started
            .get_or_try_init(|| async {
                self.store.start().await?;
                info!(
                    segment = self.config.segment_name(),
                    stale_while_revalidate = self.config.is_stale_while_revalidate(),
                    "response cache ready"
                );
                Ok::<_, StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Returns the configuration fixed at construction.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the backing store, shared with every clone.
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Returns the tracker holding keys with a background refresh in flight.
    pub fn tracker(&self) -> &RevalidationTracker {
        &self.tracker
    }

    /// Subscribes to background refresh completions.
    ///
    /// # Returns
    ///
    /// A receiver that sees every [`RevalidationEvent`] published after this
    /// call. Events are dropped for receivers that fall more than the channel
    /// capacity behind.
    pub fn subscribe(&self) -> broadcast::Receiver<RevalidationEvent> {
        self.events.subscribe()
    }

    /// Removes the cached response for `request`, if any.
    pub async fn invalidate(&self, request: &Request) -> Result<(), StoreError> {
        let key = CacheKey::generate(request);
        self.store
            .drop_entry(self.config.segment_name(), key.as_str())
            .await
    }

    async fn process(&self, request: Request, next: Next) -> Result<Response, FetchError> {
        if let Err(e) = self.start().await {
            if self.config.propagates_store_errors() {
                return Err(e.into());
            }
            warn!(error = %e, "cache store failed to start, bypassing cache");
            return next.run(request).await;
        }

        let key = CacheKey::generate(&request);

        if let Some(entry) = self.lookup(&key).await? {
            let response = entry.to_response();
            if self.config.is_stale_while_revalidate()
                && entry.needs_revalidation(current_timestamp_ms())
            {
                if self.revalidate(key.clone(), request, next).is_some() {
                    debug!(key = %key, "serving stale entry, refresh scheduled");
                } else {
                    debug!(key = %key, "serving stale entry, refresh already in flight");
                }
            } else {
                debug!(key = %key, "cache hit");
            }
            return Ok(response);
        }

        debug!(key = %key, "cache miss");
        let response = next.run(request).await?;
        self.admit(&key, &response).await?;
        Ok(response)
    }

    async fn lookup(&self, key: &CacheKey) -> Result<Option<CachedEntry>, FetchError> {
        let stored = match self.store.get(self.config.segment_name(), key.as_str()).await {
            Ok(stored) => stored,
            Err(e) if self.config.propagates_store_errors() => return Err(e.into()),
            Err(e) => {
                warn!(key = %key, error = %e, "cache lookup failed, treating as miss");
                return Ok(None);
            }
        };

        let Some(stored) = stored else {
            return Ok(None);
        };

        match serde_json::from_value::<CachedEntry>(stored.item) {
            Ok(entry) => Ok(Some(entry)),
            Err(e) => {
                warn!(key = %key, error = %e, "unreadable cache entry, treating as miss");
                Ok(None)
            }
        }
    }

    async fn admit(&self, key: &CacheKey, response: &Response) -> Result<(), FetchError> {
        let now = current_timestamp_ms();
        let plan = match freshness::admit(response, self.config.is_stale_while_revalidate(), now) {
            Admission::Store(plan) => plan,
            Admission::Skip(reason) => {
                debug!(key = %key, %reason, "response not cached");
                return Ok(());
            }
        };

        let entry = CachedEntry::from_response(response).with_revalidate_at(plan.revalidate_at);
        match self.write(key, &entry, plan.ttl).await {
            Ok(()) => Ok(()),
            Err(e) if self.config.propagates_store_errors() => Err(e.into()),
            Err(e) => {
                warn!(key = %key, error = %e, "failed to cache response");
                Ok(())
            }
        }
    }

    async fn write(&self, key: &CacheKey, entry: &CachedEntry, ttl: Duration) -> Result<(), StoreError> {
        let item = serde_json::to_value(entry)?;
        self.store
            .set(self.config.segment_name(), key.as_str(), item, ttl)
            .await?;
        debug!(key = %key, ttl_ms = duration_ms(ttl), "response cached");
        Ok(())
    }

    /// Starts a background refresh of `key` unless one is already running.
    ///
    /// Returns the task handle, or `None` when another refresh for the same
    /// key is in flight. The handle may be dropped; the task keeps running.
    pub fn revalidate(&self, key: CacheKey, request: Request, next: Next) -> Option<JoinHandle<()>> {
        let guard = self.tracker.begin(&key)?;
        let this = self.clone();

        Some(tokio::spawn(async move {
            let outcome = this.refresh_entry(&key, request, next).await;
            drop(guard);

            match &outcome {
                RevalidationOutcome::Refreshed { ttl } => {
                    info!(key = %key, ttl_ms = duration_ms(*ttl), "background refresh stored")
                }
                RevalidationOutcome::Discarded { status } => {
                    warn!(key = %key, status, "background refresh returned an uncacheable response")
                }
                RevalidationOutcome::Failed { reason } => {
                    warn!(key = %key, reason = %reason, "background refresh failed, keeping stale entry")
                }
            }

            // Having no subscribers is the normal case.
            let _ = this.events.send(RevalidationEvent { key, outcome });
        }))
    }

    async fn refresh_entry(&self, key: &CacheKey, request: Request, next: Next) -> RevalidationOutcome {
        let fetched = match &self.refresh {
            Some(refresh) => refresh(key.clone()).await,
            None => next.run(request).await,
        };

        let response = match fetched {
            Ok(response) => response,
            Err(e) => {
                return RevalidationOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if response.is_stale() || response.status().is_error() {
            return RevalidationOutcome::Discarded {
                status: response.status().as_u16(),
            };
        }

        let ttl = self.config.refresh_window_duration();
        match self.write(key, &CachedEntry::from_response(&response), ttl).await {
            Ok(()) => RevalidationOutcome::Refreshed { ttl },
            Err(e) => RevalidationOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Middleware for CachingMiddleware {
    fn handle(&self, request: Request, next: Next) -> PipelineFuture {
        let this = self.clone();
        Box::pin(async move { this.process(request, next).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, StoredItem};
    use crate::http::StatusCode;
    use crate::middleware::Transport;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const URL: &str = "http://www.example.com/path";

    /// Transport answering every request with the given cache-control header
    /// and counting how often it was called.
    fn origin(cache_control: Option<&'static str>, calls: Arc<AtomicUsize>) -> Arc<dyn Transport> {
        Arc::new(move |request: Request| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                let mut response = Response::new(StatusCode::OK)
                    .url(request.href())
                    .body(format!("origin #{n}"));
                if let Some(value) = cache_control {
                    response.add_header("cache-control", value);
                }
                Ok::<_, FetchError>(response)
            }
        })
    }

    async fn started(store: &Arc<MemoryStore>, config: CacheConfig) -> CachingMiddleware {
        let cache = CachingMiddleware::new(store.clone(), config);
        cache.start().await.unwrap();
        cache
    }

    fn next_with(transport: Arc<dyn Transport>) -> Next {
        Next::new(vec![], transport)
    }

    /// Store whose every operation fails.
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn start(&self) -> crate::cache::StoreFuture<'_, ()> {
            Box::pin(async { Ok(()) })
        }

        fn get<'a>(&'a self, _: &'a str, _: &'a str) -> crate::cache::StoreFuture<'a, Option<StoredItem>> {
            Box::pin(async { Err(StoreError::Backend("get refused".to_owned())) })
        }

        fn set<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
            _: serde_json::Value,
            _: Duration,
        ) -> crate::cache::StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::Backend("set refused".to_owned())) })
        }

        fn drop_entry<'a>(&'a self, _: &'a str, _: &'a str) -> crate::cache::StoreFuture<'a, ()> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn miss_then_hit_uses_same_key() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = origin(Some("max-age=60"), calls.clone());

        let request = Request::get(URL).query("b", 2).query("a", 1);
        let first = cache.handle(request, next_with(transport.clone())).await.unwrap();
        assert!(!first.is_from_cache());

        let reordered = Request::get(URL).query("a", 1).query("b", 2);
        let second = cache.handle(reordered, next_with(transport)).await.unwrap();
        assert!(second.is_from_cache());
        assert_eq!(second.text(), Some("origin #1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn uncacheable_response_is_fetched_every_time() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = origin(Some("max-age=0"), calls.clone());

        for _ in 0..3 {
            cache
                .handle(Request::get(URL), next_with(transport.clone()))
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_failures_are_a_miss_by_default() {
        let cache = CachingMiddleware::new(Arc::new(BrokenStore), CacheConfig::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let response = cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await
            .unwrap();
        assert_eq!(response.text(), Some("origin #1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_failures_propagate_when_configured() {
        let cache = CachingMiddleware::new(
            Arc::new(BrokenStore),
            CacheConfig::new().propagate_store_errors(true),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let result = cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await;
        assert!(matches!(result, Err(FetchError::Store(StoreError::Backend(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unreadable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        store
            .set("body", URL, json!({"not": "an entry"}), Duration::from_secs(60))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let response = cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await
            .unwrap();
        assert!(!response.is_from_cache());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fresh_hit_triggers_no_refresh() {
        let store = Arc::new(MemoryStore::new());
        let refreshes = Arc::new(AtomicUsize::new(0));
        let counted = refreshes.clone();
        let cache = started(&store, CacheConfig::new().stale_while_revalidate(true))
            .await
            .refresh(move |_key| {
                counted.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, FetchError>(Response::new(StatusCode::OK)) }
            });

        let entry = CachedEntry::from_response(&Response::new(StatusCode::OK).body("fresh"))
            .with_revalidate_at(Some(current_timestamp_ms() + 60_000));
        store
            .set("body", URL, serde_json::to_value(&entry).unwrap(), Duration::from_secs(90))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let response = cache
            .handle(Request::get(URL), next_with(origin(None, calls.clone())))
            .await
            .unwrap();

        assert_eq!(response.text(), Some("fresh"));
        assert!(cache.tracker().is_empty());
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stale_hit_without_swr_enabled_does_not_refresh() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;

        let entry = CachedEntry::from_response(&Response::new(StatusCode::OK).body("old"))
            .with_revalidate_at(Some(1));
        store
            .set("body", URL, serde_json::to_value(&entry).unwrap(), Duration::from_secs(90))
            .await
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let response = cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await
            .unwrap();
        assert_eq!(response.text(), Some("old"));
        assert!(cache.tracker().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn revalidate_without_refresh_fn_replays_pipeline() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new().stale_while_revalidate(true)).await;
        let calls = Arc::new(AtomicUsize::new(0));

        let key = CacheKey::from(URL);
        let handle = cache
            .revalidate(key.clone(), Request::get(URL), next_with(origin(None, calls.clone())))
            .expect("refresh should start");
        handle.await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stored = store.get("body", URL).await.unwrap().unwrap();
        assert_eq!(stored.ttl, Duration::from_secs(60));
        let entry: CachedEntry = serde_json::from_value(stored.item).unwrap();
        assert_eq!(entry.revalidate_at, None);
        assert!(!cache.tracker().is_revalidating(&key));
    }

    #[tokio::test]
    async fn failed_refresh_clears_tracker_and_reports() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new().stale_while_revalidate(true))
            .await
            .refresh(|key: CacheKey| async move {
                Err::<Response, _>(FetchError::Refresh(format!("{key} unreachable")))
            });
        let mut events = cache.subscribe();

        let key = CacheKey::from(URL);
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .revalidate(key.clone(), Request::get(URL), next_with(origin(None, calls)))
            .expect("refresh should start");

        let event = events.recv().await.unwrap();
        assert_eq!(event.key, key);
        assert!(matches!(event.outcome, RevalidationOutcome::Failed { .. }));
        assert!(cache.tracker().is_empty());
        assert!(store.get("body", URL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn error_status_refresh_is_discarded() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new().stale_while_revalidate(true))
            .await
            .refresh(|_key| async {
                Ok::<_, FetchError>(Response::new(StatusCode::SERVICE_UNAVAILABLE))
            });
        let mut events = cache.subscribe();

        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .revalidate(CacheKey::from(URL), Request::get(URL), next_with(origin(None, calls)))
            .expect("refresh should start");

        let event = events.recv().await.unwrap();
        assert_eq!(event.outcome, RevalidationOutcome::Discarded { status: 503 });
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn invalidate_drops_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await
            .unwrap();
        assert!(!store.is_empty().await);

        cache.invalidate(&Request::get(URL)).await.unwrap();
        assert!(store.get("body", URL).await.unwrap().is_none());
    }

    /// Store that refuses to start.
    struct ColdStore;

    impl CacheStore for ColdStore {
        fn start(&self) -> crate::cache::StoreFuture<'_, ()> {
            Box::pin(async { Err(StoreError::Backend("connection refused".to_owned())) })
        }

        fn get<'a>(&'a self, _: &'a str, _: &'a str) -> crate::cache::StoreFuture<'a, Option<StoredItem>> {
            Box::pin(async { Err(StoreError::NotReady) })
        }

        fn set<'a>(
            &'a self,
            _: &'a str,
            _: &'a str,
            _: serde_json::Value,
            _: Duration,
        ) -> crate::cache::StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::NotReady) })
        }

        fn drop_entry<'a>(&'a self, _: &'a str, _: &'a str) -> crate::cache::StoreFuture<'a, ()> {
            Box::pin(async { Err(StoreError::NotReady) })
        }

        fn is_ready(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn hit_returns_repeated_headers_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        let transport: Arc<dyn Transport> = Arc::new(|request: Request| async move {
            Ok::<_, FetchError>(
                Response::new(StatusCode::OK)
                    .header("Set-Cookie", "a=1")
                    .header("Cache-Control", "max-age=60")
                    .header("Set-Cookie", "b=2")
                    .url(request.href()),
            )
        });

        let fetched = cache
            .handle(Request::get(URL), next_with(transport.clone()))
            .await
            .unwrap();
        let cached = cache
            .handle(Request::get(URL), next_with(transport))
            .await
            .unwrap();

        assert!(cached.is_from_cache());
        assert_eq!(cached.headers(), fetched.headers());
        let pairs: Vec<_> = cached.headers().iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("Set-Cookie", "a=1"),
                ("Cache-Control", "max-age=60"),
                ("Set-Cookie", "b=2"),
            ]
        );
    }

    #[tokio::test]
    async fn reserved_query_characters_reach_origin_encoded() {
        let store = Arc::new(MemoryStore::new());
        let cache = started(&store, CacheConfig::new()).await;
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = origin(Some("max-age=60"), calls.clone());

        let request = Request::get("http://x/s?tag=a%26b&q=1");
        let fetched = cache.handle(request.clone(), next_with(transport.clone())).await.unwrap();
        assert_eq!(fetched.url_str(), "http://x/s?tag=a%26b&q=1");
        assert_eq!(Request::get(fetched.url_str()).query_param("tag"), Some("a&b"));

        let cached = cache.handle(request, next_with(transport)).await.unwrap();
        assert!(cached.is_from_cache());
        assert_eq!(cached.url_str(), "http://x/s?tag=a%26b&q=1");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn store_is_started_on_first_request() {
        let store = Arc::new(MemoryStore::new());
        let cache = CachingMiddleware::new(store.clone(), CacheConfig::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let transport = origin(Some("max-age=60"), calls.clone());

        for _ in 0..3 {
            cache
                .handle(Request::get(URL), next_with(transport.clone()))
                .await
                .unwrap();
        }

        assert!(store.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // explicit start after the fact is a no-op
        cache.start().await.unwrap();
    }

    #[tokio::test]
    async fn store_that_fails_to_start_is_bypassed() {
        let cache = CachingMiddleware::new(Arc::new(ColdStore), CacheConfig::new());
        assert!(cache.start().await.is_err());

        let calls = Arc::new(AtomicUsize::new(0));
        let response = cache
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await
            .unwrap();
        assert_eq!(response.text(), Some("origin #1"));

        let strict = CachingMiddleware::new(
            Arc::new(ColdStore),
            CacheConfig::new().propagate_store_errors(true),
        );
        let result = strict
            .handle(Request::get(URL), next_with(origin(Some("max-age=60"), calls.clone())))
            .await;
        assert!(matches!(result, Err(FetchError::Store(StoreError::Backend(_)))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
