//! Signature integration tests.
//!
//! Tests verify:
//! - Valid signatures are accepted, with and without the path
//! - Missing, tampered and wrong-secret signatures are rejected with 401
//! - The health check is never gated

use axum::http::StatusCode;
use image::ImageFormat;

use ims_server::{create_router, RouterConfig, SignatureVerifier};

use super::test_utils::{error_type, filesystem_registry, fixture_dir, inspect, send};

const TEST_SECRET: &str = "test-secret-key-for-hmac-signing";

fn pairs(params: &[(&str, &str)]) -> Vec<(String, String)> {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn signed_uri(verifier: &SignatureVerifier, path: &str, params: &[(&str, &str)]) -> String {
    format!("{}?{}", path, verifier.signed_query(path, &pairs(params)))
}

// =============================================================================
// Valid Signatures
// =============================================================================

#[tokio::test]
async fn test_valid_signature_succeeds() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new(TEST_SECRET, false);
    let uri = signed_uri(&verifier, "/cat.jpg", &[("width", "50")]);

    let (status, _, body) = send(&router, &uri).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 50, 25));
}

#[tokio::test]
async fn test_signature_from_go_query_encoding_succeeds() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, true);
    let router = create_router(filesystem_registry(&dir).await, config);

    // HMAC-SHA256 of "/cat.jpg?tag=a~b%2Ac+d&width=50", as produced by
    // url.Values.Encode on the client side.
    let uri = "/cat.jpg?width=50&tag=a~b*c%20d\
               &sig=032a4a10597fc0ba6f0d4da37b39be05130f92bde675b5415d32ea8c8f21873d";
    let (status, _, body) = send(&router, uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 50, 25));

    // Same message with `~` escaped and `*` literal.
    let uri = "/cat.jpg?width=50&tag=a~b*c%20d\
               &sig=94616935cf42b59ffe124e0632709d50a70a8b5ca6a2dc7dc3f5d30cdff7eef1";
    let (status, _, body) = send(&router, uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_type(&body), "invalid_signature");
}

#[tokio::test]
async fn test_param_order_does_not_matter() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new(TEST_SECRET, false);
    let sig = verifier.sign("/cat.jpg", &pairs(&[("width", "50"), ("height", "10")]));

    let uri = format!("/cat.jpg?sig={}&height=10&width=50", sig);
    let (status, _, _) = send(&router, &uri).await;

    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_without_path_signature_is_reusable_across_paths() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new(TEST_SECRET, false);
    let query = verifier.signed_query("/cat.jpg", &pairs(&[("width", "20")]));

    let (status, _, _) = send(&router, &format!("/logo.png?{}", query)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_with_path_signature_is_bound_to_path() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, true);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new(TEST_SECRET, true);
    let query = verifier.signed_query("/cat.jpg", &pairs(&[("width", "20")]));

    let (status, _, _) = send(&router, &format!("/cat.jpg?{}", query)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(&router, &format!("/logo.png?{}", query)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_type(&body), "invalid_signature");
}

// =============================================================================
// Rejected Signatures
// =============================================================================

#[tokio::test]
async fn test_missing_signature_rejected() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let (status, _, body) = send(&router, "/cat.jpg?width=50").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_type(&body), "missing_signature");

    let (status, _, _) = send(&router, "/cat.jpg?width=50&sig=").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_tampered_query_rejected() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new(TEST_SECRET, false);
    let sig = verifier.sign("/cat.jpg", &pairs(&[("width", "50")]));

    let (status, _, body) = send(&router, &format!("/cat.jpg?width=51&sig={}", sig)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_type(&body), "invalid_signature");
}

#[tokio::test]
async fn test_wrong_secret_rejected() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let verifier = SignatureVerifier::new("another-secret", false);
    let uri = signed_uri(&verifier, "/cat.jpg", &[("width", "50")]);

    let (status, _, _) = send(&router, &uri).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_signature_checked_before_backend_lookup() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, false);
    let router = create_router(filesystem_registry(&dir).await, config);

    let (status, _, _) = send(&router, "/missing.jpg").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_is_public() {
    let dir = fixture_dir();
    let config = RouterConfig::new().with_signing_secret(TEST_SECRET, true);
    let router = create_router(filesystem_registry(&dir).await, config);

    let (status, _, _) = send(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
