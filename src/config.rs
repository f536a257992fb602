//! Cache configuration.
//!
//! Values are fixed when the middleware is constructed. They can be built in
//! code through the builder setters or loaded from environment variables.

use std::env;
use std::time::Duration;

/// Default lifetime of an entry written by a background refresh.
pub const DEFAULT_REFRESH_WINDOW: Duration = Duration::from_secs(60);

/// Default store segment for cached response bodies.
pub const DEFAULT_SEGMENT: &str = "body";

/// Constructor-time configuration for [`CachingMiddleware`](crate::cache::CachingMiddleware).
///
/// | Setting                   | Default | Environment variable                   |
/// |---------------------------|---------|----------------------------------------|
/// | `stale_while_revalidate`  | `false` | `RTTP_CACHE_STALE_WHILE_REVALIDATE`    |
/// | `refresh_window`          | 60 s    | `RTTP_CACHE_REFRESH_WINDOW_SECS`       |
/// | `segment`                 | `body`  | `RTTP_CACHE_SEGMENT`                   |
/// | `propagate_store_errors`  | `false` | `RTTP_CACHE_PROPAGATE_STORE_ERRORS`    |
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use rttp_cache::CacheConfig;
///
/// let config = CacheConfig::new()
///     .stale_while_revalidate(true)
///     .refresh_window(Duration::from_secs(30));
///
/// assert!(config.is_stale_while_revalidate());
/// assert_eq!(config.segment_name(), "body");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    stale_while_revalidate: bool,
    refresh_window: Duration,
    segment: String,
    propagate_store_errors: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_while_revalidate: false,
            refresh_window: DEFAULT_REFRESH_WINDOW,
            segment: DEFAULT_SEGMENT.to_owned(),
            propagate_store_errors: false,
        }
    }
}

impl CacheConfig {
    /// Same as [`CacheConfig::default`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the process environment.
    ///
    /// Missing or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            stale_while_revalidate: lookup("RTTP_CACHE_STALE_WHILE_REVALIDATE")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.stale_while_revalidate),
            refresh_window: lookup("RTTP_CACHE_REFRESH_WINDOW_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.refresh_window),
            segment: lookup("RTTP_CACHE_SEGMENT")
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.segment),
            propagate_store_errors: lookup("RTTP_CACHE_PROPAGATE_STORE_ERRORS")
                .and_then(|v| parse_flag(&v))
                .unwrap_or(defaults.propagate_store_errors),
        }
    }

    /// Serve stale entries while refreshing them in the background.
    #[must_use]
    pub fn stale_while_revalidate(mut self, enabled: bool) -> Self {
        self.stale_while_revalidate = enabled;
        self
    }

    /// Lifetime given to entries written by a background refresh.
    #[must_use]
    pub fn refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    /// Store segment that cached responses are written under.
    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = segment.into();
        self
    }

    /// Fail the request when the store fails instead of treating it as a miss.
    #[must_use]
    pub fn propagate_store_errors(mut self, enabled: bool) -> Self {
        self.propagate_store_errors = enabled;
        self
    }

    pub fn is_stale_while_revalidate(&self) -> bool {
        self.stale_while_revalidate
    }

    /// TTL given to entries written by a background refresh.
    pub fn refresh_window_duration(&self) -> Duration {
        self.refresh_window
    }

    /// Store segment cached responses live under.
    pub fn segment_name(&self) -> &str {
        &self.segment
    }

    pub fn propagates_store_errors(&self) -> bool {
        self.propagate_store_errors
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
