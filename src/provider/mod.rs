//! Byte-source providers.
//!
//! A provider turns a logical filename into a [`ByteStream`]. The registry
//! maps each host to exactly one provider, built once at startup and shared
//! read-only by every request.
//!
//! # Variants
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────┐
//! │ Filesystem   │ file under a fixed root, traversal-safe              │
//! │ Origin       │ filename resolved against one base URL               │
//! │ Proxy        │ filename is itself the absolute upstream URL         │
//! │ S3           │ object key in an S3 (or compatible) bucket           │
//! │ GCS          │ object key in a Google Cloud Storage bucket          │
//! └──────────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! All variants report failures through [`ProviderError`]. Outbound work is
//! tied to the request future: dropping it aborts the fetch.

mod fetch;
mod filesystem;
mod gcs;
mod origin;
mod proxy;
mod s3;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::io::ByteStream;

pub use filesystem::FilesystemProvider;
pub use gcs::GcsProvider;
pub use origin::OriginProvider;
pub use proxy::ProxyProvider;
pub use s3::{create_s3_client, S3Provider, S3Settings};

/// The kind of a provider, used for routing decisions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Filesystem,
    Origin,
    Proxy,
    S3,
    Gcs,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderKind::Filesystem => "filesystem",
            ProviderKind::Origin => "origin",
            ProviderKind::Proxy => "proxy",
            ProviderKind::S3 => "s3",
            ProviderKind::Gcs => "gcs",
        };
        f.write_str(name)
    }
}

/// A source of raw image bytes.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Open `filename` and return its contents as a stream.
    async fn provide(&self, filename: &str) -> Result<ByteStream, ProviderError>;

    /// Which variant this provider is.
    fn kind(&self) -> ProviderKind;
}
