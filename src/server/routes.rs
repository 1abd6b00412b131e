//! Router configuration for the image gateway.
//!
//! # Route Structure
//!
//! ```text
//! /health       - Health check (public)
//! /             - Image endpoint, proxy backends (signed when a secret is set)
//! /{*path}      - Image endpoint (signed when a secret is set)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ims_server::registry::{BackendRegistry, SigningPolicy};
//! use ims_server::server::routes::{create_router, RouterConfig};
//!
//! let registry = BackendRegistry::build(
//!     "localhost:8080",
//!     &["./images".to_string()],
//!     "",
//!     SigningPolicy::default(),
//! )
//! .await?;
//!
//! let config = RouterConfig::new()
//!     .with_signing_secret("my-secret-key", true)
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(registry, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{health_handler, image_handler, AppState};
use super::signing::{signature_middleware, SignatureVerifier};
use crate::registry::BackendRegistry;

/// Default Cache-Control max-age in seconds (15 minutes).
pub const DEFAULT_CACHE_TIMEOUT: u64 = 900;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Secret for request signatures (None = signatures not checked)
    pub signing_secret: Option<String>,

    /// Whether the request path is part of the signed message
    pub signing_with_path: bool,

    /// Allowed CORS origins (None = no CORS headers)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds (0 = no cache headers)
    pub cache_timeout: u64,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a new router configuration.
    ///
    /// By default:
    /// - Signatures are not checked
    /// - No CORS layer
    /// - Cache timeout is 15 minutes
    /// - Tracing is enabled
    pub fn new() -> Self {
        Self {
            signing_secret: None,
            signing_with_path: false,
            cors_origins: None,
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            enable_tracing: true,
        }
    }

    /// Require signed requests.
    pub fn with_signing_secret(mut self, secret: impl Into<String>, with_path: bool) -> Self {
        self.signing_secret = Some(secret.into());
        self.signing_with_path = with_path;
        self
    }

    /// Set the allowed CORS origins.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_timeout(mut self, seconds: u64) -> Self {
        self.cache_timeout = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    fn verifier(&self) -> Option<SignatureVerifier> {
        self.signing_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .map(|secret| SignatureVerifier::new(secret, self.signing_with_path))
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// The health check is always public; image routes are wrapped in the
/// signature middleware when a signing secret is configured.
pub fn create_router(registry: BackendRegistry, config: RouterConfig) -> Router {
    let app_state = AppState::new(registry, config.cache_timeout);

    let image_routes = Router::new()
        .route("/", get(image_handler))
        .route("/{*path}", get(image_handler))
        .with_state(app_state);

    let image_routes = match config.verifier() {
        Some(verifier) => image_routes.layer(middleware::from_fn_with_state(
            verifier,
            signature_middleware,
        )),
        None => image_routes,
    };

    let public_routes = Router::new().route("/health", get(health_handler));

    let mut router = Router::new().merge(public_routes).merge(image_routes);

    if let Some(cors) = build_cors_layer(&config) {
        router = router.layer(cors);
    }

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer, if any origins are configured.
fn build_cors_layer(config: &RouterConfig) -> Option<CorsLayer> {
    let origins = config.cors_origins.as_ref()?;

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .filter_map(|o| o.parse().ok())
        .collect();
    if parsed_origins.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
            .allow_headers([CONTENT_TYPE])
            .allow_origin(parsed_origins)
            .max_age(Duration::from_secs(86400)),
    )
}

// =============================================================================
// Tests
// =============================================================================
