//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │                 GET /{*path}?width=..&sig=..                    │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   signing   │  │        routes           │  │
//! │  │ (requests)  │  │ (HMAC sig)  │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod handlers;
pub mod routes;
pub mod signing;

pub use handlers::{
    health_handler, image_handler, AppState, ErrorResponse, HandlerError, HealthResponse,
};
pub use routes::{create_router, RouterConfig, DEFAULT_CACHE_TIMEOUT};
pub use signing::{signature_middleware, SignatureError, SignatureVerifier, SIGNATURE_PARAM};
