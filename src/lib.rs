//! # ims-server
//!
//! An image gateway that resolves each request to a byte source, optionally
//! verifies a request signature, transforms the image according to the query
//! string and re-encodes it with cache headers.
//!
//! ## Features
//!
//! - **Host-routed backends**: local directories, HTTP origins, a signed
//!   transparent proxy, S3 buckets and GCS buckets
//! - **Upstream response cache**: in memory or on disk, honouring
//!   Cache-Control and revalidating with ETag/Last-Modified
//! - **Transforms**: center crop, resize with several filters and fit modes,
//!   rotation/mirroring, gaussian blur
//! - **Output**: JPEG (with quality), PNG or GIF
//! - **Signing**: optional HMAC-SHA256 signatures over the query, with or
//!   without the path
//!
//! ## Architecture
//!
//! - [`registry`] - Host to provider table built from backend declarations
//! - [`provider`] - Byte sources behind the [`Provider`] trait
//! - [`transport`] - Outbound HTTP and the caching decorator
//! - [`transform`] - Crop, resize, orient and blur
//! - [`encoder`] - Output format selection and encoding
//! - [`server`] - Axum handlers, signature middleware and routes
//! - [`config`] - CLI and environment configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use ims_server::{create_router, BackendRegistry, RouterConfig, SigningPolicy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = BackendRegistry::build(
//!         "localhost:8080",
//!         &["./images".to_string()],
//!         ":memory:",
//!         SigningPolicy::default(),
//!     )
//!     .await
//!     .expect("valid backends");
//!
//!     let router = create_router(registry, RouterConfig::new());
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod io;
pub mod params;
pub mod provider;
pub mod registry;
pub mod server;
pub mod transform;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use encoder::{encode, process, EncodedImage, OutputFormat, DEFAULT_JPEG_QUALITY};
pub use error::{ImageError, ProviderError, RegistryError, TransportError};
pub use io::ByteStream;
pub use params::QueryParams;
pub use provider::{
    FilesystemProvider, GcsProvider, OriginProvider, Provider, ProviderKind, ProxyProvider,
    S3Provider,
};
pub use registry::{parse_backend, BackendRegistry, SigningPolicy};
pub use server::{
    create_router, health_handler, image_handler, AppState, ErrorResponse, HealthResponse,
    RouterConfig, SignatureError, SignatureVerifier,
};
pub use transform::TransformOptions;
pub use transport::{CachingTransport, DiskStore, HttpTransport, MemoryStore, OriginCache, Transport};
