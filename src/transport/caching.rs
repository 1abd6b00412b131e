//! Response cache decorator for the outbound transport.
//!
//! # Behaviour
//!
//! - Only `200 OK` responses whose `Cache-Control` allows a shared cache to
//!   store them are kept, and only when they carry either an explicit lifetime
//!   (`max-age`, `s-maxage`, `Expires`) or a validator (`ETag`,
//!   `Last-Modified`).
//! - Fresh entries are answered locally and tagged with `X-From-Cache: 1`.
//! - Stale entries are revalidated with `If-None-Match` / `If-Modified-Since`.
//!   A `304` refreshes the stored headers and serves the stored body.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::DateTime;
use http::header::{DATE, ETAG, EXPIRES, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use tracing::debug;
use url::Url;

use super::cache_control::CacheControl;
use super::{Transport, TransportResponse};
use crate::error::TransportError;
use crate::io::{from_bytes, read_to_bytes};

/// Header added to responses served from the cache.
pub const FROM_CACHE_HEADER: HeaderName = HeaderName::from_static("x-from-cache");

// =============================================================================
// Cached Response
// =============================================================================

/// A stored upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub stored_at: SystemTime,
}

impl CachedResponse {
    /// How long the response stays fresh after it was stored.
    ///
    /// `no-cache` forces revalidation, so it yields a zero lifetime.
    pub fn freshness_lifetime(&self) -> Duration {
        let cc = CacheControl::from_headers(&self.headers);
        if cc.no_cache {
            return Duration::ZERO;
        }
        if let Some(lifetime) = cc.freshness_lifetime() {
            return lifetime;
        }

        let Some(expires) = header_time(&self.headers, &EXPIRES) else {
            return Duration::ZERO;
        };
        let date = header_time(&self.headers, &DATE).unwrap_or(self.stored_at);
        expires.duration_since(date).unwrap_or(Duration::ZERO)
    }

    /// Whether the entry can be served without contacting the upstream.
    pub fn is_fresh(&self, now: SystemTime) -> bool {
        let age = now.duration_since(self.stored_at).unwrap_or(Duration::ZERO);
        age < self.freshness_lifetime()
    }

    /// Whether the entry carries a validator for conditional requests.
    pub fn has_validator(&self) -> bool {
        self.headers.contains_key(ETAG) || self.headers.contains_key(LAST_MODIFIED)
    }

    /// Merge the headers of a `304 Not Modified` into the entry.
    fn refresh(&mut self, not_modified: &HeaderMap, now: SystemTime) {
        for name in not_modified.keys() {
            let values: Vec<HeaderValue> = not_modified.get_all(name).iter().cloned().collect();
            self.headers.remove(name);
            for value in values {
                self.headers.append(name.clone(), value);
            }
        }
        self.stored_at = now;
    }

    fn to_response(&self) -> TransportResponse {
        let mut headers = self.headers.clone();
        headers.insert(FROM_CACHE_HEADER, HeaderValue::from_static("1"));
        TransportResponse {
            status: self.status,
            headers,
            body: from_bytes(self.body.clone()),
        }
    }
}

fn header_time(headers: &HeaderMap, name: &HeaderName) -> Option<SystemTime> {
    let value = headers.get(name)?.to_str().ok()?;
    DateTime::parse_from_rfc2822(value).ok().map(SystemTime::from)
}

/// Whether a fresh upstream response should be stored.
fn is_cacheable(status: StatusCode, headers: &HeaderMap) -> bool {
    if status != StatusCode::OK {
        return false;
    }
    let cc = CacheControl::from_headers(headers);
    if !cc.is_storable() {
        return false;
    }
    cc.freshness_lifetime().is_some()
        || headers.contains_key(EXPIRES)
        || headers.contains_key(ETAG)
        || headers.contains_key(LAST_MODIFIED)
}

// =============================================================================
// Response Store
// =============================================================================

/// Storage backend for cached responses, keyed by request URL.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Look up a stored response.
    async fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Store (or replace) a response.
    async fn put(&self, key: &str, response: CachedResponse);
}

// =============================================================================
// Caching Transport
// =============================================================================

/// Transport decorator that answers from a [`ResponseStore`] when it can.
pub struct CachingTransport<S: ResponseStore> {
    inner: Arc<dyn Transport>,
    store: S,
}

impl<S: ResponseStore> CachingTransport<S> {
    /// Wrap `inner` with a cache backed by `store`.
    pub fn new(inner: Arc<dyn Transport>, store: S) -> Self {
        Self { inner, store }
    }
}

#[async_trait]
impl<S: ResponseStore> Transport for CachingTransport<S> {
    async fn get(
        &self,
        url: &Url,
        mut headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let key = url.as_str();
        let cached = self.store.get(key).await;

        if let Some(entry) = &cached {
            if entry.is_fresh(SystemTime::now()) {
                debug!(url = %url, "Origin cache hit");
                return Ok(entry.to_response());
            }
            if let Some(etag) = entry.headers.get(ETAG) {
                headers.insert(IF_NONE_MATCH, etag.clone());
            }
            if let Some(last_modified) = entry.headers.get(LAST_MODIFIED) {
                headers.insert(IF_MODIFIED_SINCE, last_modified.clone());
            }
        }

        let response = self.inner.get(url, headers).await?;

        if response.status == StatusCode::NOT_MODIFIED {
            if let Some(mut entry) = cached {
                debug!(url = %url, "Origin cache revalidated");
                entry.refresh(&response.headers, SystemTime::now());
                self.store.put(key, entry.clone()).await;
                return Ok(entry.to_response());
            }
        }

        if !is_cacheable(response.status, &response.headers) {
            return Ok(response);
        }

        let body = read_to_bytes(response.body)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;

        let entry = CachedResponse {
            status: response.status,
            headers: response.headers,
            body,
            stored_at: SystemTime::now(),
        };
        if !entry.is_fresh(entry.stored_at) && !entry.has_validator() {
            debug!(url = %url, "Response expired on arrival, not caching");
        } else {
            self.store.put(key, entry.clone()).await;
        }

        Ok(TransportResponse {
            status: entry.status,
            headers: entry.headers,
            body: from_bytes(entry.body),
        })
    }
}
