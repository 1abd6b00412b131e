//! API integration tests for the image endpoint.
//!
//! Tests verify:
//! - Resizing, cropping and format selection end to end
//! - Cache headers
//! - Error cases (unknown host, missing file, bad filename)

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use image::ImageFormat;
use tower::ServiceExt;

use ims_server::{create_router, BackendRegistry, RouterConfig};

use super::test_utils::{error_type, filesystem_registry, fixture_dir, inspect, send};

// =============================================================================
// Image Retrieval
// =============================================================================

#[tokio::test]
async fn test_resize_by_width() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, headers, body) = send(&router, "/cat.jpg?width=50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/jpeg");
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 50, 25));
}

#[tokio::test]
async fn test_no_params_reencodes_original_size() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/cat.jpg").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 200, 100));
}

#[tokio::test]
async fn test_nested_path() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/nested/dog.jpg?height=20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 40, 20));
}

#[tokio::test]
async fn test_png_source_stays_png() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, headers, body) = send(&router, "/logo.png?width=32").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/png");
    assert_eq!(inspect(&body), (ImageFormat::Png, 32, 32));
}

#[tokio::test]
async fn test_explicit_format() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, headers, body) = send(&router, "/cat.jpg?format=gif&width=20").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers.get(header::CONTENT_TYPE).unwrap(), "image/gif");
    assert_eq!(inspect(&body), (ImageFormat::Gif, 20, 10));
}

#[tokio::test]
async fn test_crop_fit_and_orient() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (_, _, body) = send(&router, "/cat.jpg?crop=100,100").await;
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 100, 100));

    let (_, _, body) = send(&router, "/cat.jpg?width=30&height=60&fit=cover").await;
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 30, 60));

    let (_, _, body) = send(&router, "/cat.jpg?width=100&height=100&fit=bounds").await;
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 100, 50));

    let (_, _, body) = send(&router, "/cat.jpg?orient=r").await;
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 100, 200));
}

#[tokio::test]
async fn test_malformed_params_are_ignored() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(
        &router,
        "/cat.jpg?width=wide&crop=abc&orient=sideways&blur=-1&quality=best",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 200, 100));
}

#[tokio::test]
async fn test_oversized_blur_is_clamped() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/cat.jpg?blur=1e30").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 200, 100));

    let (status, _, _) = send(&router, "/health").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_overflowing_width_is_clamped() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/cat.jpg?width=99999999999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 200, 100));
}

#[tokio::test]
async fn test_no_upscaling() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (_, _, body) = send(&router, "/cat.jpg?width=400").await;
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 200, 100));
}

// =============================================================================
// Cache Headers
// =============================================================================

#[tokio::test]
async fn test_cache_headers() {
    let dir = fixture_dir();
    let router = create_router(
        filesystem_registry(&dir).await,
        RouterConfig::new().with_cache_timeout(300),
    );

    let (_, headers, _) = send(&router, "/cat.jpg").await;

    assert_eq!(
        headers.get(header::CACHE_CONTROL).unwrap(),
        "public, max-age=300"
    );
    assert!(headers.contains_key(header::EXPIRES));
    let last_modified = headers.get(header::LAST_MODIFIED).unwrap().to_str().unwrap();
    assert!(last_modified.ends_with(" GMT"));
}

#[tokio::test]
async fn test_cache_headers_disabled() {
    let dir = fixture_dir();
    let router = create_router(
        filesystem_registry(&dir).await,
        RouterConfig::new().with_cache_timeout(0),
    );

    let (_, headers, _) = send(&router, "/cat.jpg").await;

    assert!(!headers.contains_key(header::CACHE_CONTROL));
    assert!(!headers.contains_key(header::EXPIRES));
    assert!(headers.contains_key(header::LAST_MODIFIED));
}

// =============================================================================
// Error Handling
// =============================================================================

#[tokio::test]
async fn test_missing_file_returns_404() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/missing.jpg").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_type(&body), "not_found");
}

#[tokio::test]
async fn test_directory_returns_404() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, _) = send(&router, "/nested").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_stays_inside_root() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, _) = send(&router, "/nested/../../../../etc/passwd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, body) = send(&router, "/nested/../cat.jpg?width=10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inspect(&body), (ImageFormat::Jpeg, 10, 5));
}

#[tokio::test]
async fn test_root_path_is_bad_filename() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_type(&body), "bad_filename");
}

#[tokio::test]
async fn test_unknown_host_returns_400() {
    let dir = fixture_dir();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let request = Request::builder()
        .uri("/cat.jpg")
        .header(header::HOST, "elsewhere.test")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(error_type(&body), "unknown_host");
}

#[tokio::test]
async fn test_undecodable_file_returns_500() {
    let dir = fixture_dir();
    std::fs::write(dir.path().join("notes.txt"), b"plain text").unwrap();
    let router = create_router(filesystem_registry(&dir).await, RouterConfig::new());

    let (status, _, body) = send(&router, "/notes.txt").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_type(&body), "decode_error");
}

#[tokio::test]
async fn test_multiple_hosts() {
    let first = fixture_dir();
    let second = tempfile::tempdir().unwrap();
    std::fs::write(
        second.path().join("only-here.jpg"),
        super::test_utils::create_jpeg(10, 10),
    )
    .unwrap();

    let registry = BackendRegistry::build(
        super::test_utils::TEST_HOST,
        &[
            first.path().to_string_lossy().to_string(),
            format!("other.test,{}", second.path().to_string_lossy()),
        ],
        "",
        Default::default(),
    )
    .await
    .unwrap();
    let router = create_router(registry, RouterConfig::new());

    let (status, _, _) = send(&router, "/only-here.jpg").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let request = Request::builder()
        .uri("/only-here.jpg")
        .header(header::HOST, "other.test")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let router = create_router(BackendRegistry::new(), RouterConfig::new());

    let (status, _, body) = send(&router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
    assert!(json["version"].is_string());
}
