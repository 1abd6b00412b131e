//! HTTP request handlers for the image gateway.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - `GET /{*path}` - Serve a transformed image from the backend registered
//!   for the request host

use std::sync::Arc;

use axum::{
    extract::{OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::{AppendHeaders, IntoResponse, Response},
    Json,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::encoder::process;
use crate::error::{ImageError, ProviderError};
use crate::io::read_to_bytes;
use crate::params::{QueryParams, URL};
use crate::provider::ProviderKind;
use crate::registry::BackendRegistry;

use super::signing::decoded_path;

/// Shortest proxy target that can be a URL (`http://x`).
const MIN_PROXY_URL_LEN: usize = 8;

/// Format of `Last-Modified` and `Expires` values.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state passed to handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Providers keyed by request host
    pub registry: Arc<BackendRegistry>,

    /// Cache-Control max-age in seconds (0 disables cache headers)
    pub cache_timeout: u64,
}

impl AppState {
    pub fn new(registry: BackendRegistry, cache_timeout: u64) -> Self {
        Self {
            registry: Arc::new(registry),
            cache_timeout,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "bad_filename")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Everything the image handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("No such host: {0}")]
    UnknownHost(String),

    #[error("Bad filename: {0}")]
    BadFilename(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

impl HandlerError {
    fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            HandlerError::UnknownHost(_) => (StatusCode::BAD_REQUEST, "unknown_host"),
            HandlerError::BadFilename(_) => (StatusCode::BAD_REQUEST, "bad_filename"),
            HandlerError::Provider(err) => match err {
                ProviderError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ProviderError::BadFilename(_) => (StatusCode::BAD_REQUEST, "bad_filename"),
                ProviderError::BadGateway { .. } => (StatusCode::BAD_GATEWAY, "bad_gateway"),
                ProviderError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "provider_error")
                }
            },
            HandlerError::Image(err) => match err {
                ImageError::Decode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
                ImageError::Transform(_) => (StatusCode::INTERNAL_SERVER_ERROR, "transform_error"),
                ImageError::Encode(_) => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
                ImageError::Cancelled => (StatusCode::INTERNAL_SERVER_ERROR, "cancelled"),
            },
        }
    }
}

/// Convert HandlerError to HTTP response.
///
/// 5xx errors are logged at ERROR, 404s at DEBUG and other 4xx at WARN.
impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.classify();
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle image requests.
///
/// # Flow
///
/// 1. Resolve the provider for the request host
/// 2. Take the filename from the path, or from `url` for the proxy backend
/// 3. Fetch the source bytes
/// 4. Decode, transform and encode on a blocking thread
///
/// Dropping the request future (client disconnect) cancels the outbound fetch
/// and stops the blocking work at its next checkpoint.
pub async fn image_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Result<Response, HandlerError> {
    let host = request_host(&headers, &uri);
    let provider = state
        .registry
        .get(&host)
        .ok_or_else(|| HandlerError::UnknownHost(host.clone()))?;

    let params = QueryParams::parse(uri.query().unwrap_or(""));
    let filename = match provider.kind() {
        ProviderKind::Proxy => proxy_target(&params)?,
        _ => path_filename(uri.path())?,
    };

    debug!(host = %host, provider = %provider.kind(), filename = %filename, "Fetching image");

    let stream = provider.provide(&filename).await?;
    let source = read_to_bytes(stream).await.map_err(|e| {
        ProviderError::Internal(format!("cannot read file from provider: {}", e))
    })?;

    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    let encoded = tokio::task::spawn_blocking(move || process(&source, &params, &cancel))
        .await
        .map_err(|e| ImageError::Transform(format!("image task failed: {}", e)))??;

    let headers = response_headers(encoded.content_type, state.cache_timeout, Utc::now());

    Ok((StatusCode::OK, AppendHeaders(headers), encoded.data).into_response())
}

/// Handle health check requests.
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// The `Host` header, falling back to the URI authority.
fn request_host(headers: &HeaderMap, uri: &http::Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

fn path_filename(path: &str) -> Result<String, HandlerError> {
    let decoded = decoded_path(path);
    let filename = decoded.strip_prefix('/').unwrap_or(&decoded);
    if filename.is_empty() {
        return Err(HandlerError::BadFilename("filename too short".to_string()));
    }
    Ok(filename.to_string())
}

fn proxy_target(params: &QueryParams) -> Result<String, HandlerError> {
    match params.get(URL) {
        Some(url) if url.len() >= MIN_PROXY_URL_LEN => Ok(url.to_string()),
        _ => Err(HandlerError::BadFilename(
            "url parameter missing or too short".to_string(),
        )),
    }
}

fn http_date(time: DateTime<Utc>) -> String {
    time.format(HTTP_DATE_FORMAT).to_string()
}

/// `Content-Type` and `Last-Modified`, plus `Cache-Control` and `Expires`
/// when a cache timeout is configured.
fn response_headers(
    content_type: &'static str,
    cache_timeout: u64,
    now: DateTime<Utc>,
) -> Vec<(header::HeaderName, String)> {
    let mut headers = vec![
        (header::CONTENT_TYPE, content_type.to_string()),
        (header::LAST_MODIFIED, http_date(now)),
    ];

    if cache_timeout > 0 {
        headers.push((
            header::CACHE_CONTROL,
            format!("public, max-age={}", cache_timeout),
        ));

        let expires = i64::try_from(cache_timeout)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl));
        if let Some(expires) = expires {
            headers.push((header::EXPIRES, http_date(expires)));
        }
    }

    headers
}

// =============================================================================
// Tests
// =============================================================================
