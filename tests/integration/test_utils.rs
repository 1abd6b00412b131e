//! Test utilities for integration tests.
//!
//! Fixture images, filesystem-backed registries and a small upstream HTTP
//! server for origin and proxy backends.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use http_body_util::BodyExt;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;
use tower::ServiceExt;

use ims_server::{BackendRegistry, SigningPolicy};

/// Host header every test request is sent with.
pub const TEST_HOST: &str = "images.test";

// =============================================================================
// Fixture Images
// =============================================================================

pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

pub fn create_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    encoder.encode_image(&img).unwrap();
    buf
}

pub fn create_png(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(gradient(width, height));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Decode a response body and return its format and dimensions.
pub fn inspect(body: &[u8]) -> (ImageFormat, u32, u32) {
    let format = image::guess_format(body).unwrap();
    let img = image::load_from_memory(body).unwrap();
    (format, img.width(), img.height())
}

/// A directory with `cat.jpg` (200x100), `logo.png` (64x64) and
/// `nested/dog.jpg` (80x40).
pub fn fixture_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cat.jpg"), create_jpeg(200, 100)).unwrap();
    std::fs::write(dir.path().join("logo.png"), create_png(64, 64)).unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested/dog.jpg"), create_jpeg(80, 40)).unwrap();
    dir
}

/// A registry serving `dir` for [`TEST_HOST`].
pub async fn filesystem_registry(dir: &TempDir) -> BackendRegistry {
    let declaration = dir.path().to_string_lossy().to_string();
    BackendRegistry::build(TEST_HOST, &[declaration], "", SigningPolicy::default())
        .await
        .unwrap()
}

// =============================================================================
// Requests
// =============================================================================

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::HOST, TEST_HOST)
        .body(Body::empty())
        .unwrap()
}

/// Send `uri` through `router` and collect the response.
pub async fn send(router: &Router, uri: &str) -> (StatusCode, header::HeaderMap, Bytes) {
    let response = router.clone().oneshot(get_request(uri)).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

pub fn error_type(body: &[u8]) -> String {
    let json: serde_json::Value = serde_json::from_slice(body).unwrap();
    json["error"].as_str().unwrap().to_string()
}

// =============================================================================
// Upstream Server
// =============================================================================

/// A local HTTP server standing in for a remote origin.
///
/// Serves `/images/cat.jpg` (cacheable for 60s), `/images/fresh.jpg`
/// (`no-store`), `/images/broken.jpg` (503) and 404 for anything else.
pub struct Upstream {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct UpstreamState {
    image: Bytes,
    hits: Arc<AtomicUsize>,
}

impl Upstream {
    pub async fn start() -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = UpstreamState {
            image: Bytes::from(create_jpeg(200, 100)),
            hits: Arc::clone(&hits),
        };

        let app = Router::new()
            .route("/images/{*name}", get(serve_upstream))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests the upstream has answered.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn serve_upstream(
    State(state): State<UpstreamState>,
    Path(name): Path<String>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    match name.as_str() {
        "cat.jpg" => (
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "public, max-age=60"),
            ],
            state.image.clone(),
        )
            .into_response(),
        "fresh.jpg" => (
            [
                (header::CONTENT_TYPE, "image/jpeg"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            state.image.clone(),
        )
            .into_response(),
        "broken.jpg" => StatusCode::SERVICE_UNAVAILABLE.into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}
