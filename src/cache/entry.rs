//! The record written into a cache store.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::{Headers, Response, StatusCode};

/// A response snapshot as stored in the cache.
///
/// Entries are immutable once stored; writing the same key again replaces the
/// whole entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedEntry {
    pub body: Bytes,
    pub headers: Headers,
    pub status_code: u16,
    /// Origin latency of the original fetch, in milliseconds.
    pub elapsed_time: u64,
    pub url: String,
    /// Unix milliseconds after which a hit should trigger a background refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revalidate_at: Option<u64>,
}

impl CachedEntry {
    /// Snapshots a response. `revalidate_at` starts unset.
    pub fn from_response(response: &Response) -> Self {
        Self {
            body: response.body_bytes().clone(),
            headers: response.headers().clone(),
            status_code: response.status().as_u16(),
            elapsed_time: u64::try_from(response.elapsed_time().as_millis()).unwrap_or(u64::MAX),
            url: response.url_str().to_owned(),
            revalidate_at: None,
        }
    }

    #[must_use]
    pub fn with_revalidate_at(mut self, revalidate_at: Option<u64>) -> Self {
        self.revalidate_at = revalidate_at;
        self
    }

    /// Rebuilds the outbound response, flagged as served from cache.
    pub fn to_response(&self) -> Response {
        Response::new(StatusCode::from(self.status_code))
            .headers_from(self.headers.clone())
            .body(self.body.clone())
            .url(self.url.clone())
            .elapsed(Duration::from_millis(self.elapsed_time))
            .cached()
    }

    /// Returns `true` once `now_ms` has reached `revalidate_at`.
    ///
    /// Entries without a revalidation time never ask for a refresh.
    pub fn needs_revalidation(&self, now_ms: u64) -> bool {
        self.revalidate_at.is_some_and(|at| at <= now_ms)
    }
}

/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
