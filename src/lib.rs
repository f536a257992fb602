//! # rttp-cache
//!
//! `Cache-Control` aware response caching for async HTTP client pipelines,
//! with optional stale-while-revalidate background refreshes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use rttp_cache::cache::{CachingMiddleware, MemoryStore};
//! use rttp_cache::middleware::FetchError;
//! use rttp_cache::{CacheConfig, Client, Request, Response, StatusCode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = CachingMiddleware::new(Arc::new(MemoryStore::new()), CacheConfig::from_env());
//!     cache.start().await?;
//!
//!     let client = Client::new(|request: Request| async move {
//!         Ok::<_, FetchError>(
//!             Response::new(StatusCode::OK)
//!                 .header("Cache-Control", "max-age=60")
//!                 .url(request.href())
//!                 .body("Hello, World!"),
//!         )
//!     })
//!     .with_middleware(cache);
//!
//!     let first = client.execute(Request::get("http://127.0.0.1:8080/")).await?;
//!     let second = client.execute(Request::get("http://127.0.0.1:8080/")).await?;
//!     assert!(!first.is_from_cache());
//!     assert!(second.is_from_cache());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod http;
pub mod middleware;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{CacheKey, CachingMiddleware};
pub use client::Client;
pub use config::CacheConfig;
pub use http::{Headers, Method, Request, Response, StatusCode};
pub use middleware::{FetchError, Middleware, Next};
