//! `Cache-Control` header parsing.
//!
//! Only the directives the cache layer acts on are recognized. Everything
//! else, including malformed tokens, is ignored so that a bad header degrades
//! to "do not cache" instead of an error.

use std::collections::HashMap;

/// Name of the response header carrying caching directives.
pub const CACHE_CONTROL: &str = "cache-control";

/// Seconds a response stays fresh.
pub const MAX_AGE: &str = "max-age";

/// Seconds a stale response may still be served while it is refreshed.
pub const STALE_WHILE_REVALIDATE: &str = "stale-while-revalidate";

const RECOGNIZED: [&str; 2] = [MAX_AGE, STALE_WHILE_REVALIDATE];

/// Recognized directives parsed from a `Cache-Control` value, in seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    map: HashMap<&'static str, u64>,
}

impl Directives {
    /// Returns a directive value by (lowercase) name.
    pub fn get(&self, name: &str) -> Option<u64> {
        self.map.get(name).copied()
    }

    /// `max-age` in seconds, if present and numeric.
    pub fn max_age(&self) -> Option<u64> {
        self.get(MAX_AGE)
    }

    /// `stale-while-revalidate` in seconds, if present and numeric.
    pub fn stale_while_revalidate(&self) -> Option<u64> {
        self.get(STALE_WHILE_REVALIDATE)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Parses a raw `Cache-Control` header value.
///
/// Tokens are comma-separated `directive` or `directive=value` pairs. Names
/// match case-insensitively and values may be quoted. When a directive
/// repeats, the first valid occurrence wins.
///
/// # Examples
///
/// ```
/// use rttp_cache::cache::cache_control;
///
/// let directives = cache_control::parse("public, max-age=60, stale-while-revalidate=30");
/// assert_eq!(directives.max_age(), Some(60));
/// assert_eq!(directives.stale_while_revalidate(), Some(30));
/// assert!(cache_control::parse("").is_empty());
/// ```
pub fn parse(header: &str) -> Directives {
    let mut map = HashMap::new();

    for token in header.split(',') {
        let Some((name, value)) = token.split_once('=') else {
            continue;
        };
        let name = name.trim();
        let Some(known) = RECOGNIZED.iter().find(|d| d.eq_ignore_ascii_case(name)) else {
            continue;
        };
        let Ok(seconds) = value.trim().trim_matches('"').parse::<u64>() else {
            continue;
        };
        map.entry(*known).or_insert(seconds);
    }

    Directives { map }
}
