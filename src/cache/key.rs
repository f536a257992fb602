//! Cache key derivation.

use std::fmt;

use percent_encoding::utf8_percent_encode;

use crate::http::{QUERY_COMPONENT, Request};

/// Identifies a cached response: the request URL plus its canonicalized query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for a request.
    ///
    /// Without query parameters the key is the URL verbatim. Otherwise the
    /// parameters are sorted by name, percent-encoded, joined as `k=v` pairs
    /// with `&` and appended after `?`, so the key does not depend on the order
    /// in which the parameters were added.
    ///
    /// # Examples
    ///
    /// ```
    /// use rttp_cache::cache::CacheKey;
    /// use rttp_cache::http::Request;
    ///
    /// let a = Request::get("http://x/y").query("b", 2).query("a", 1);
    /// let b = Request::get("http://x/y?a=1&b=2");
    /// assert_eq!(CacheKey::generate(&a), CacheKey::generate(&b));
    /// assert_eq!(CacheKey::generate(&a).as_str(), "http://x/y?a=1&b=2");
    /// ```
    pub fn generate(request: &Request) -> Self {
        if !request.has_queries() {
            return Self(request.url().to_owned());
        }

        let mut pairs: Vec<(&str, &str)> = request.queries().collect();
        pairs.sort_unstable();

        let query = pairs
            .into_iter()
            .map(|(name, value)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(name, QUERY_COMPONENT),
                    utf8_percent_encode(value, QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&");

        Self(format!("{}?{}", request.url(), query))
    }

    /// Returns the key as the string handed to a store.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for CacheKey {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
