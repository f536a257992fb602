//! Outgoing HTTP request description.

use percent_encoding::{percent_decode_str, utf8_percent_encode};

use super::{Headers, Method, QUERY_COMPONENT};

/// An outgoing HTTP request as seen by the middleware pipeline.
///
/// The URL is kept without its query string; query parameters live in a
/// separate ordered mapping so middleware can inspect them. A repeated name
/// replaces the earlier value but keeps its original position.
///
/// # Examples
///
/// ```
/// use rttp_cache::http::Request;
///
/// let request = Request::get("http://www.example.com/search?q=rust")
///     .query("page", "2");
///
/// assert_eq!(request.url(), "http://www.example.com/search");
/// assert!(request.has_queries());
/// assert_eq!(request.query_param("q"), Some("rust"));
/// assert_eq!(request.href(), "http://www.example.com/search?q=rust&page=2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
    queries: Vec<(String, String)>,
}

impl Request {
    /// Creates a request. A query string already present in `url` is split off,
    /// percent-decoded, and moved into the query mapping.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let mut url = url.into();

        if let Some(pos) = url.find('#') {
            url.truncate(pos);
        }

        let queries = match url.find('?') {
            Some(pos) => {
                let parsed = parse_query_string(&url[pos + 1..]);
                url.truncate(pos);
                parsed
            }
            None => Vec::new(),
        };

        let mut request = Self {
            method,
            url,
            headers: Headers::new(),
            queries: Vec::with_capacity(queries.len()),
        };
        for (name, value) in queries {
            request.set_query(name, value);
        }
        request
    }

    /// Shorthand for `Request::new(Method::Get, url)`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    /// Adds a query parameter, replacing any earlier value for the same name.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_query(name.into(), value.to_string());
        self
    }

    /// Appends a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    fn set_query(&mut self, name: String, value: String) {
        match self.queries.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.queries.push((name, value)),
        }
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the URL without its query string.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns `true` if at least one query parameter is set.
    pub fn has_queries(&self) -> bool {
        !self.queries.is_empty()
    }

    /// Returns the query parameters in insertion order.
    pub fn queries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns a query parameter value by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.queries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the full URL to put on the wire.
    ///
    /// Query parameters keep their insertion order and are percent-encoded, so
    /// `Request::get(request.href())` parses back to the same parameters.
    pub fn href(&self) -> String {
        if self.queries.is_empty() {
            return self.url.clone();
        }
        let query = self
            .queries
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    utf8_percent_encode(k, QUERY_COMPONENT),
                    utf8_percent_encode(v, QUERY_COMPONENT)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, query)
    }
}

/// Parses a URL query string (`key=value&key2=value2`) into ordered pairs.
///
/// `+` is decoded as a space before percent-decoding. Empty segments are skipped.
fn parse_query_string(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = decode_component(parts.next()?);
            let value = decode_component(parts.next().unwrap_or(""));
            Some((key, value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}
