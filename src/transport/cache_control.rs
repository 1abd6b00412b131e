//! `Cache-Control` parsing for stored origin responses.
//!
//! Only the directives that decide whether a response may be stored and how
//! long it stays fresh are tracked. Unknown directives are ignored.

use std::time::Duration;

/// Parsed `Cache-Control` directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl {
    /// max-age
    pub max_age: Option<Duration>,

    /// s-maxage, preferred over max-age by shared caches
    pub s_maxage: Option<Duration>,

    /// no-store: never keep the response
    pub no_store: bool,

    /// no-cache: keep the response but revalidate before every use
    pub no_cache: bool,

    /// private: not for a shared cache
    pub private: bool,
}

impl CacheControl {
    /// Parse a header value such as `public, max-age=3600`.
    pub fn parse(header_value: &str) -> Self {
        let mut result = Self::default();

        for directive in header_value.split(',') {
            let directive = directive.trim().to_ascii_lowercase();
            if directive.is_empty() {
                continue;
            }

            if let Some((name, value)) = directive.split_once('=') {
                let value = value.trim().trim_matches('"');
                let seconds = value.parse::<u64>().ok().map(Duration::from_secs);
                match name.trim() {
                    "max-age" => result.max_age = seconds,
                    "s-maxage" => result.s_maxage = seconds,
                    _ => {}
                }
            } else {
                match directive.as_str() {
                    "no-store" => result.no_store = true,
                    "no-cache" => result.no_cache = true,
                    "private" => result.private = true,
                    _ => {}
                }
            }
        }

        result
    }

    /// Parse the `Cache-Control` header from a header map, if present.
    pub fn from_headers(headers: &http::HeaderMap) -> Self {
        headers
            .get(http::header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(Self::parse)
            .unwrap_or_default()
    }

    /// Whether a shared cache may store the response at all.
    pub fn is_storable(&self) -> bool {
        !self.no_store && !self.private
    }

    /// Explicit freshness lifetime from the directives, if any.
    pub fn freshness_lifetime(&self) -> Option<Duration> {
        self.s_maxage.or(self.max_age)
    }
}
