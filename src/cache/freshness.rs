//! Admission rules and TTL arithmetic for freshly fetched responses.

use std::fmt;
use std::time::Duration;

use super::cache_control::{self, CACHE_CONTROL};
use crate::http::Response;

/// How a response should be written into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoragePlan {
    /// Lifetime handed to the store.
    pub ttl: Duration,
    /// Unix milliseconds after which a hit triggers a background refresh.
    pub revalidate_at: Option<u64>,
}

/// Why a response was not admitted into the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Upstream logic flagged the response as stale.
    Stale,
    /// Status code 400 or above.
    ErrorStatus(u16),
    /// `max-age` missing, unparsable or zero.
    NoMaxAge,
    /// The response itself came out of a cache.
    FromCache,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale => f.write_str("response marked stale"),
            Self::ErrorStatus(code) => write!(f, "error status {code}"),
            Self::NoMaxAge => f.write_str("no positive max-age"),
            Self::FromCache => f.write_str("response served from cache"),
        }
    }
}

/// Outcome of [`admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Store(StoragePlan),
    Skip(SkipReason),
}

/// Decides whether `response` may be cached and, if so, for how long.
///
/// With `stale_while_revalidate` enabled and a positive
/// `stale-while-revalidate` directive, the entry lives for `max-age + swr`
/// seconds and asks for a refresh once `max-age` has elapsed. Otherwise it
/// lives for `max-age` seconds with no refresh point.
pub fn admit(response: &Response, stale_while_revalidate: bool, now_ms: u64) -> Admission {
    if response.is_stale() {
        return Admission::Skip(SkipReason::Stale);
    }
    if response.status().is_error() {
        return Admission::Skip(SkipReason::ErrorStatus(response.status().as_u16()));
    }

    let directives = cache_control::parse(response.headers().get(CACHE_CONTROL).unwrap_or(""));
    let max_age = match directives.max_age() {
        Some(secs) if secs > 0 => secs,
        _ => return Admission::Skip(SkipReason::NoMaxAge),
    };
    if response.is_from_cache() {
        return Admission::Skip(SkipReason::FromCache);
    }

    let swr = directives.stale_while_revalidate().unwrap_or(0);
    let plan = if stale_while_revalidate && swr > 0 {
        StoragePlan {
            ttl: seconds_to_ttl(max_age.saturating_add(swr)),
            revalidate_at: Some(now_ms.saturating_add(max_age.saturating_mul(1000))),
        }
    } else {
        StoragePlan {
            ttl: seconds_to_ttl(max_age),
            revalidate_at: None,
        }
    };

    Admission::Store(plan)
}

/// Saturating seconds → TTL conversion kept in whole milliseconds.
fn seconds_to_ttl(secs: u64) -> Duration {
    Duration::from_millis(secs.saturating_mul(1000))
}
