//! Disk-backed response store.
//!
//! Each entry is two files named after the SHA-256 of the request URL:
//!
//! ```text
//! {cache_dir}/{hash}.meta   JSON: status, headers, stored_at, body_len
//! {cache_dir}/{hash}.body   raw response body
//! ```
//!
//! Files are written to a uniquely named temporary file in the cache
//! directory and renamed into place, body first, so a reader never sees
//! metadata for a body that is still being written. Concurrent writers of
//! the same entry each use their own temporary file; the last rename wins.
//! Unreadable or inconsistent entries are treated as misses.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::caching::{CachedResponse, ResponseStore};

/// Serialized form of a stored response, minus its body.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    headers: Vec<(String, String)>,
    stored_at: u64,
    body_len: usize,
}

impl EntryMeta {
    fn from_response(response: &CachedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let stored_at = response
            .stored_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        Self {
            status: response.status.as_u16(),
            headers,
            stored_at,
            body_len: response.body.len(),
        }
    }

    fn into_response(self, body: Bytes) -> Option<CachedResponse> {
        if body.len() != self.body_len {
            return None;
        }
        let status = StatusCode::from_u16(self.status).ok()?;
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).ok()?;
            let value = HeaderValue::from_str(&value).ok()?;
            headers.append(name, value);
        }

        Some(CachedResponse {
            status,
            headers,
            body,
            stored_at: UNIX_EPOCH + Duration::from_secs(self.stored_at),
        })
    }
}

/// Hash a cache key into a file name stem.
fn key_to_hash(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Response store persisted under a directory.
///
/// The directory is created on first write.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// Create a store rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn paths(&self, key: &str) -> (PathBuf, PathBuf) {
        let hash = key_to_hash(key);
        (
            self.dir.join(format!("{}.meta", hash)),
            self.dir.join(format!("{}.body", hash)),
        )
    }

    async fn read_entry(&self, key: &str) -> std::io::Result<Option<CachedResponse>> {
        let (meta_path, body_path) = self.paths(key);
        let meta = tokio::fs::read(&meta_path).await?;
        let meta: EntryMeta = match serde_json::from_slice(&meta) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(path = %meta_path.display(), "Corrupt cache metadata: {}", e);
                return Ok(None);
            }
        };
        let body = tokio::fs::read(&body_path).await?;
        Ok(meta.into_response(Bytes::from(body)))
    }

    async fn write_entry(&self, key: &str, response: &CachedResponse) -> std::io::Result<()> {
        let (meta_path, body_path) = self.paths(key);
        let meta = serde_json::to_vec(&EntryMeta::from_response(response))?;

        tokio::fs::create_dir_all(&self.dir).await?;
        write_file_atomic(&self.dir, body_path, response.body.clone()).await?;
        write_file_atomic(&self.dir, meta_path, Bytes::from(meta)).await
    }
}

async fn write_file_atomic(dir: &Path, path: PathBuf, data: Bytes) -> std::io::Result<()> {
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(&data)?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::other)?
}

#[async_trait]
impl ResponseStore for DiskStore {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        match self.read_entry(key).await {
            Ok(entry) => entry,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(dir = %self.dir.display(), "Failed to read cache entry: {}", e);
                None
            }
        }
    }

    async fn put(&self, key: &str, response: CachedResponse) {
        match self.write_entry(key, &response).await {
            Ok(()) => debug!(dir = %self.dir.display(), "Stored origin response on disk"),
            Err(e) => warn!(dir = %self.dir.display(), "Failed to write cache entry: {}", e),
        }
    }
}
