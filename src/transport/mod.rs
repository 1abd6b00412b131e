//! Outbound HTTP transport used by the origin and proxy providers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │ Origin / Proxy       │
//! │ provider             │
//! └──────────┬───────────┘
//!            │ get(url)
//!            ▼
//! ┌──────────────────────┐     ┌───────────────────────────┐
//! │ CachingTransport<S>  │────▶│ ResponseStore             │
//! │ (optional)           │     │ MemoryStore | DiskStore   │
//! └──────────┬───────────┘     └───────────────────────────┘
//!            │ miss / revalidate
//!            ▼
//! ┌──────────────────────┐
//! │ HttpTransport        │
//! │ (reqwest)            │
//! └──────────────────────┘
//! ```
//!
//! Which wrapper is used is decided once at startup from the origin cache
//! setting (see [`OriginCache`]). Every provider receives its own wrapped
//! transport, so no response is shared across providers.

mod cache_control;
mod caching;
mod disk;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, StatusCode};
use url::Url;

use crate::error::TransportError;
use crate::io::{from_body_stream, ByteStream};

pub use cache_control::CacheControl;
pub use caching::{CachedResponse, CachingTransport, ResponseStore, FROM_CACHE_HEADER};
pub use disk::DiskStore;
pub use memory::{MemoryStore, DEFAULT_MEMORY_CACHE_CAPACITY};

/// Value of the origin cache setting that selects the in-memory cache.
pub const MEMORY_CACHE_SENTINEL: &str = ":memory:";

// =============================================================================
// Transport Trait
// =============================================================================

/// A response from the outbound transport.
///
/// The body is streamed; the caller owns it and must drain or drop it.
pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

/// An HTTP transport capable of issuing GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET for `url` with the given extra request headers.
    async fn get(&self, url: &Url, headers: HeaderMap)
        -> Result<TransportResponse, TransportError>;
}

// =============================================================================
// reqwest Transport
// =============================================================================

/// The network transport, backed by a `reqwest` client.
///
/// Timeouts and connection pooling are whatever the client was built with.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(
        &self,
        url: &Url,
        headers: HeaderMap,
    ) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();

        Ok(TransportResponse {
            status,
            headers,
            body: from_body_stream(response.bytes_stream()),
        })
    }
}

// =============================================================================
// Origin Cache Selection
// =============================================================================

/// Response cache placed in front of a provider's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginCache {
    /// Use the raw transport
    Disabled,

    /// Process-local in-memory cache
    Memory,

    /// Disk-backed cache rooted at the given directory
    Disk(PathBuf),
}

impl OriginCache {
    /// Interpret the origin cache setting.
    ///
    /// An empty value disables caching, `:memory:` selects the in-memory
    /// cache and anything else is a cache directory.
    pub fn parse(value: &str) -> Self {
        match value {
            "" => OriginCache::Disabled,
            MEMORY_CACHE_SENTINEL => OriginCache::Memory,
            dir => OriginCache::Disk(PathBuf::from(dir)),
        }
    }

    /// Decorate `inner` with this cache.
    ///
    /// Each call builds a fresh store, so callers get a private cache.
    pub fn wrap(&self, inner: Arc<dyn Transport>) -> Arc<dyn Transport> {
        match self {
            OriginCache::Disabled => inner,
            OriginCache::Memory => Arc::new(CachingTransport::new(inner, MemoryStore::new())),
            OriginCache::Disk(dir) => {
                Arc::new(CachingTransport::new(inner, DiskStore::new(dir.clone())))
            }
        }
    }
}
