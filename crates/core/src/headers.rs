// crates/core/src/headers.rs
//! Response header bag with typed accessors for the caching headers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ETAG: &str = "etag";
pub const EXPIRES: &str = "expires";
pub const DATE: &str = "date";
pub const CACHE_CONTROL: &str = "cache-control";
pub const LAST_MODIFIED: &str = "last-modified";
pub const LOCATION: &str = "location";
pub const IF_NONE_MATCH: &str = "if-none-match";
pub const PRAGMA: &str = "pragma";

/// HTTP headers keyed by lowercased name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Creates an empty header bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header, returning self
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a header, replacing any previous value
    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    /// Gets a header value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Removes a header
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// Copies every header of `other` over this one
    ///
    /// Headers absent from `other` (notably `etag`) are kept.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in &other.0 {
            self.0.insert(name.clone(), value.clone());
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over `(name, value)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn etag(&self) -> Option<&str> {
        self.get(ETAG)
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.get(LAST_MODIFIED)
    }

    pub fn location(&self) -> Option<&str> {
        self.get(LOCATION)
    }

    /// Raw `Expires` value; see [`parse_http_date`]
    pub fn expires(&self) -> Option<&str> {
        self.get(EXPIRES)
    }

    /// Parsed `Date` header, if present and well formed
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.get(DATE).and_then(parse_http_date)
    }

    /// Parsed `Cache-Control` directives
    pub fn cache_control(&self) -> CacheControl {
        self.get(CACHE_CONTROL)
            .map(CacheControl::parse)
            .unwrap_or_default()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// The `Cache-Control` directives that affect freshness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheControl {
    pub max_age: Option<i64>,
    pub no_cache: bool,
    pub no_store: bool,
}

impl CacheControl {
    /// Parses a `Cache-Control` header value; unknown directives are ignored
    pub fn parse(value: &str) -> Self {
        let mut directives = Self::default();
        for directive in value.split(',').map(str::trim) {
            let (name, argument) = match directive.split_once('=') {
                Some((name, argument)) => (name.trim(), Some(argument.trim().trim_matches('"'))),
                None => (directive, None),
            };
            match name.to_ascii_lowercase().as_str() {
                "max-age" => directives.max_age = argument.and_then(|a| a.parse().ok()),
                "no-cache" => directives.no_cache = true,
                "no-store" => directives.no_store = true,
                _ => {}
            }
        }
        directives
    }
}

/// Parses an HTTP date (`Wed, 21 Oct 2015 07:28:00 GMT`)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Formats a timestamp as an HTTP date
pub fn format_http_date(date: DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_names_are_case_insensitive() {
        let headers = Headers::new().with("ETag", "\"v1\"");
        assert_eq!(headers.get("etag"), Some("\"v1\""));
        assert_eq!(headers.etag(), Some("\"v1\""));
    }

    #[test]
    fn test_merge_preserves_absent_etag() {
        let mut held = Headers::new().with(ETAG, "\"v1\"").with(DATE, "old");
        held.merge(&Headers::new().with(DATE, "new"));
        assert_eq!(held.etag(), Some("\"v1\""));
        assert_eq!(held.get(DATE), Some("new"));
    }

    #[test]
    fn test_cache_control_parse() {
        let cc = CacheControl::parse("public, max-age=60, no-cache");
        assert_eq!(cc.max_age, Some(60));
        assert!(cc.no_cache);
        assert!(!cc.no_store);

        let cc = CacheControl::parse("max-age=\"0\"");
        assert_eq!(cc.max_age, Some(0));
    }

    #[test]
    fn test_http_date_round_trip() {
        let date = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        let text = format_http_date(date);
        assert_eq!(text, "Wed, 21 Oct 2015 07:28:00 GMT");
        assert_eq!(parse_http_date(&text), Some(date));
        assert_eq!(parse_http_date("0"), None);
    }

    #[test]
    fn test_from_iterator() {
        let headers: Headers = vec![("Location", "https://api.example.com/a")]
            .into_iter()
            .collect();
        assert_eq!(headers.location(), Some("https://api.example.com/a"));
        assert_eq!(headers.len(), 1);
    }
}
