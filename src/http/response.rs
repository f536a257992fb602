//! HTTP response as returned through the client pipeline.
//!
//! Provides a fluent builder API so transports and tests can assemble
//! responses, plus the two flags the cache layer cares about: whether the
//! response was served from cache and whether upstream logic marked it stale.

use std::time::Duration;

use bytes::Bytes;

use super::{Headers, StatusCode};
use crate::cache::CachedEntry;

/// An HTTP response delivered to the caller of a pipeline.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::{Response, StatusCode};
///
/// let response = Response::new(StatusCode::OK)
///     .header("Cache-Control", "max-age=60")
///     .body("I am a string!");
///
/// assert_eq!(response.text(), Some("I am a string!"));
/// assert!(!response.is_from_cache());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    status: StatusCode,
    headers: Headers,
    body: Bytes,
    elapsed: Duration,
    url: String,
    from_cache: bool,
    is_stale: bool,
}

impl Response {
    /// Creates a new response with the given status and an empty body.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Bytes::new(),
            elapsed: Duration::ZERO,
            url: String::new(),
            from_cache: false,
            is_stale: false,
        }
    }

    /// Appends a response header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replaces the whole header map.
    #[must_use]
    pub fn headers_from(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Records the URL the response was fetched from.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Records how long the origin took to answer.
    #[must_use]
    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Marks the response as stale, which vetoes caching it.
    #[must_use]
    pub fn stale(mut self, is_stale: bool) -> Self {
        self.is_stale = is_stale;
        self
    }

    pub(crate) fn cached(mut self) -> Self {
        self.from_cache = true;
        self
    }

    /// Appends a header in-place. Intended for middleware that decorates a
    /// response received from downstream.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Sets the stale flag in-place.
    pub fn mark_stale(&mut self) {
        self.is_stale = true;
    }

    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers in the order they were received.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the raw response body.
    pub fn body_bytes(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as UTF-8 text, or `None` if it is not valid UTF-8.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Returns the URL the response was fetched from, or an empty string if
    /// the transport did not record one.
    pub fn url_str(&self) -> &str {
        &self.url
    }

    /// Returns the origin latency recorded by the transport.
    pub fn elapsed_time(&self) -> Duration {
        self.elapsed
    }

    /// Returns `true` if this response was rebuilt from a cache entry.
    pub fn is_from_cache(&self) -> bool {
        self.from_cache
    }

    /// Returns `true` if upstream logic marked this response as stale.
    pub fn is_stale(&self) -> bool {
        self.is_stale
    }

    /// Returns the plain serializable record of this response, the same shape
    /// the cache layer writes into a store.
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(CachedEntry::from_response(self))
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}
