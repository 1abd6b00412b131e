//! ims-server - An image gateway that transforms images on the fly.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ims_server::{config::Config, create_router, BackendRegistry};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let default_host = config.default_host();
    let declarations = config.backend_declarations();

    info!("Configuration:");
    info!("  Default host: {}", default_host);
    if config.origin_cache.is_empty() {
        info!("  Origin cache: disabled");
    } else {
        info!("  Origin cache: {}", config.origin_cache);
    }
    if config.cache_timeout > 0 {
        info!("  Cache timeout: {}s", config.cache_timeout);
    } else {
        info!("  Cache timeout: disabled");
    }

    if config.signing_secret().is_some() {
        info!(
            "  Signing: enabled (path {})",
            if config.signing_with_path {
                "included"
            } else {
                "not included"
            }
        );
    } else {
        warn!("  Signing: DISABLED - any transform can be requested");
    }

    let registry = match BackendRegistry::build(
        &default_host,
        &declarations,
        &config.origin_cache,
        config.signing_policy(),
    )
    .await
    {
        Ok(registry) => registry,
        Err(e) => {
            error!("Failed to configure backends: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("  Hosts: {}", registry.hosts().join(", "));

    let router = create_router(registry, config.router_config());

    let addr = config.bind_address();

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    info!("Server listening on: http://{}", addr);

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "ims_server=debug,tower_http=debug"
    } else {
        "ims_server=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
