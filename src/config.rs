//! Configuration management for the image gateway.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `IMS_` prefix
//! - Defaults for all settings
//!
//! # Example
//!
//! ```ignore
//! use ims_server::config::Config;
//!
//! let config = Config::parse();
//! println!("Listening on {}", config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `IMS_HOST` - Server bind address (default: 0.0.0.0)
//! - `IMS_PORT` - Server port (default: 8080)
//! - `IMS_DEFAULT_HOST` - Host for backends declared without one (default: bind address)
//! - `IMS_BACKEND` - Space separated `[host,]origin` declarations (default: ./)
//! - `IMS_ORIGIN_CACHE` - Upstream response cache: empty, `:memory:` or a directory
//! - `IMS_CACHE_TIMEOUT` - Cache-Control max-age in seconds, 0 disables (default: 900)
//! - `IMS_SIGNING_SECRET` - HMAC secret for request signatures
//! - `IMS_SIGNING_WITH_PATH` - Include the request path in signatures
//! - `IMS_CORS_DOMAINS` - Comma separated CORS origins
//!
//! Object-store backends read their credentials from the usual provider
//! variables (`S3_*`, `AWS_*`, `GOOGLE_*`).

use clap::Parser;

use crate::registry::SigningPolicy;
use crate::server::{RouterConfig, DEFAULT_CACHE_TIMEOUT};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default backend: the working directory for the default host.
pub const DEFAULT_BACKEND: &str = "./";

// =============================================================================
// CLI Arguments
// =============================================================================

/// ims-server - An image gateway that transforms images on the fly.
///
/// Resolves each request host to a filesystem, HTTP origin, proxy, S3 or GCS
/// backend, applies crop/resize/orient/blur from the query string and
/// re-encodes the result.
#[derive(Parser, Debug, Clone)]
#[command(name = "ims-server")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "IMS_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "IMS_PORT")]
    pub port: u16,

    // =========================================================================
    // Backend Configuration
    // =========================================================================
    /// Host used for backends declared without one.
    ///
    /// Defaults to the bind address.
    #[arg(long, env = "IMS_DEFAULT_HOST")]
    pub default_host: Option<String>,

    /// Backend declaration `[host,]origin`; may be repeated.
    ///
    /// Origins: a directory, an http(s) URL, `:proxy:`, `s3://bucket` or
    /// `gs://bucket`.
    #[arg(
        long = "backend",
        env = "IMS_BACKEND",
        value_delimiter = ' ',
        default_value = DEFAULT_BACKEND
    )]
    pub backends: Vec<String>,

    /// Cache for upstream responses: empty disables, `:memory:` keeps them in
    /// memory, anything else is a directory.
    #[arg(long, default_value = "", env = "IMS_ORIGIN_CACHE")]
    pub origin_cache: String,

    /// Cache-Control max-age in seconds for served images (0 disables).
    #[arg(long, default_value_t = DEFAULT_CACHE_TIMEOUT, env = "IMS_CACHE_TIMEOUT")]
    pub cache_timeout: u64,

    // =========================================================================
    // Signing Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 request signatures.
    ///
    /// When set, every image request must carry a valid `sig` parameter.
    #[arg(long, env = "IMS_SIGNING_SECRET")]
    pub signing_secret: Option<String>,

    /// Include the request path in the signed message.
    ///
    /// Required for the `:proxy:` backend.
    #[arg(long, default_value_t = false, env = "IMS_SIGNING_WITH_PATH")]
    pub signing_with_path: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, no CORS headers are sent.
    #[arg(long, env = "IMS_CORS_DOMAINS", value_delimiter = ',')]
    pub cors_domains: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        if self.backends.iter().all(|b| b.trim().is_empty()) {
            return Err(
                "At least one backend is required. Set --backend or IMS_BACKEND".to_string(),
            );
        }

        if self.signing_with_path && self.signing_secret().is_none() {
            return Err(
                "Signing with path is enabled but no secret provided. \
                 Set --signing-secret or IMS_SIGNING_SECRET"
                    .to_string(),
            );
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The host that backends without an explicit host are attached to.
    pub fn default_host(&self) -> String {
        match self.default_host.as_deref() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => self.bind_address(),
        }
    }

    /// Non-empty backend declarations.
    pub fn backend_declarations(&self) -> Vec<String> {
        self.backends
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The signing secret, if one is set and non-empty.
    pub fn signing_secret(&self) -> Option<&str> {
        self.signing_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn signing_policy(&self) -> SigningPolicy<'_> {
        SigningPolicy {
            secret: self.signing_secret(),
            with_path: self.signing_with_path,
        }
    }

    /// Router settings derived from this configuration.
    pub fn router_config(&self) -> RouterConfig {
        let mut router = RouterConfig::new()
            .with_cache_timeout(self.cache_timeout)
            .with_tracing(!self.no_tracing);

        if let Some(secret) = self.signing_secret() {
            router = router.with_signing_secret(secret, self.signing_with_path);
        }

        if let Some(domains) = &self.cors_domains {
            router = router.with_cors_origins(domains.clone());
        }

        router
    }
}

// =============================================================================
// Tests
// =============================================================================
