//! Signed request verification.
//!
//! Requests carry an HMAC-SHA256 signature in the `sig` query parameter,
//! computed over the canonical form of the remaining query parameters and,
//! when path binding is enabled, the request path:
//!
//! ```text
//! canonical = "{key}={value}&..."            (sorted by key, sig removed)
//! message   = canonical                      (path binding disabled)
//!           | "{path}?{canonical}"           (path binding enabled)
//! sig       = hex(HMAC-SHA256(secret, message))
//! ```
//!
//! Keys and values in the canonical form are escaped like Go's
//! `url.QueryEscape`: `A-Za-z0-9-_.~` stay literal, space becomes `+` and
//! every other byte is `%XX` with uppercase hex.
//!
//! ```text
//! /photos/cat.jpg?width=200&height=100&sig=5f1c...
//! ```
//!
//! The submitted signature is compared to the expected lowercase hex digest
//! in constant time.
//!
//! # Example
//!
//! ```rust
//! use ims_server::server::signing::SignatureVerifier;
//!
//! let verifier = SignatureVerifier::new("my-secret-key", true);
//! let params = vec![("width".to_string(), "200".to_string())];
//!
//! let sig = verifier.sign("/photos/cat.jpg", &params);
//!
//! let mut signed = params.clone();
//! signed.push(("sig".to_string(), sig));
//! assert!(verifier.verify("/photos/cat.jpg", &signed).is_ok());
//! ```

use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use url::form_urlencoded;

use super::handlers::ErrorResponse;

/// Query parameter carrying the signature.
pub const SIGNATURE_PARAM: &str = "sig";

// =============================================================================
// Types
// =============================================================================

type HmacSha256 = Hmac<Sha256>;

/// Signature verification failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// The `sig` parameter is absent or empty
    MissingSignature,

    /// The signature does not match
    InvalidSignature,
}

impl std::fmt::Display for SignatureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignatureError::MissingSignature => write!(f, "Missing signature parameter"),
            SignatureError::InvalidSignature => write!(f, "Signature invalid"),
        }
    }
}

impl std::error::Error for SignatureError {}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let status = StatusCode::UNAUTHORIZED;
        let (error_type, message) = match &self {
            SignatureError::MissingSignature => ("missing_signature", self.to_string()),
            SignatureError::InvalidSignature => ("invalid_signature", self.to_string()),
        };

        match &self {
            SignatureError::InvalidSignature => {
                warn!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Signature check failed: {}",
                    message
                );
            }
            SignatureError::MissingSignature => {
                debug!(
                    error_type = error_type,
                    status = status.as_u16(),
                    "Signature check failed: {}",
                    message
                );
            }
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Signature Verifier
// =============================================================================

/// HMAC-SHA256 request signer and verifier.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    include_path: bool,
}

impl SignatureVerifier {
    /// Create a verifier for `secret`, optionally binding signatures to the
    /// request path.
    pub fn new(secret: impl AsRef<[u8]>, include_path: bool) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            include_path,
        }
    }

    /// Whether signatures cover the request path.
    pub fn include_path(&self) -> bool {
        self.include_path
    }

    /// The string the HMAC is computed over.
    pub fn canonical_string(&self, path: &str, params: &[(String, String)]) -> String {
        let query = canonical_query(params);
        if self.include_path {
            format!("{}?{}", path, query)
        } else {
            query
        }
    }

    /// Compute the lowercase hex signature for a request.
    ///
    /// Any `sig` entry in `params` is ignored.
    pub fn sign(&self, path: &str, params: &[(String, String)]) -> String {
        let message = self.canonical_string(path, params);

        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Verify the `sig` entry of `params` against the rest of the request.
    pub fn verify(&self, path: &str, params: &[(String, String)]) -> Result<(), SignatureError> {
        let provided = params
            .iter()
            .find(|(key, _)| key == SIGNATURE_PARAM)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingSignature)?;

        let expected = self.sign(path, params);

        if expected.as_bytes().ct_eq(provided.as_bytes()).into() {
            Ok(())
        } else {
            Err(SignatureError::InvalidSignature)
        }
    }

    /// Build a signed query string (without the leading `?`).
    pub fn signed_query(&self, path: &str, params: &[(String, String)]) -> String {
        let signature = self.sign(path, params);

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in params.iter().filter(|(key, _)| key != SIGNATURE_PARAM) {
            serializer.append_pair(key, value);
        }
        serializer.append_pair(SIGNATURE_PARAM, &signature);
        serializer.finish()
    }
}

/// Encode `params` without `sig`, sorted by key.
///
/// The sort is stable, so repeated keys keep their request order.
fn canonical_query(params: &[(String, String)]) -> String {
    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(key, _)| key != SIGNATURE_PARAM)
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    pairs
        .into_iter()
        .map(|(key, value)| format!("{}={}", query_escape(key), query_escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Escape one query component with `+` for spaces.
fn query_escape(component: &str) -> String {
    // `%` itself is escaped to `%25`, so `%20` can only come from a space.
    urlencoding::encode(component).replace("%20", "+")
}

/// Decoded query parameters of a URI, in request order.
pub fn query_pairs(query: Option<&str>) -> Vec<(String, String)> {
    form_urlencoded::parse(query.unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}

/// Percent-decoded request path; the raw path if it is not valid UTF-8.
pub fn decoded_path(path: &str) -> String {
    urlencoding::decode(path)
        .map(|p| p.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Reject requests whose signature does not verify with 401.
///
/// ```ignore
/// let verifier = SignatureVerifier::new("secret", true);
/// let app = Router::new()
///     .route("/{*path}", get(image_handler))
///     .layer(middleware::from_fn_with_state(verifier, signature_middleware));
/// ```
pub async fn signature_middleware(
    State(verifier): State<SignatureVerifier>,
    OriginalUri(original_uri): OriginalUri,
    request: Request,
    next: Next,
) -> Result<Response, SignatureError> {
    let params = query_pairs(original_uri.query());
    let path = decoded_path(original_uri.path());

    verifier.verify(&path, &params)?;

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
