//! Pyramid Tiler - deep-zoom tile server.
//!
//! This binary starts the HTTP server and configures all components.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_tiler::{
    config::Config,
    render::LocalRenderingService,
    server::{create_router, RouterConfig},
    tile::{TileCache, TileService},
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::parse();

    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Pyramid Tiler v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Images directory: {}", config.images_dir.display());
    info!("  Server id: {}", config.server_id);
    info!("  Zoom direction: {}", config.zoom_direction);
    info!(
        "  Cache: {}MB, {} entries",
        config.cache_tiles / (1024 * 1024),
        config.cache_entries
    );

    let backend = LocalRenderingService::new(&config.images_dir);

    match backend.list_images().await {
        Ok(images) if images.is_empty() => {
            warn!("  No images found in {}", config.images_dir.display());
        }
        Ok(images) => info!("  Found {} image(s)", images.len()),
        Err(e) => {
            error!(
                "Cannot read images directory {}: {}",
                config.images_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let cache = TileCache::with_capacity_and_entries(config.cache_tiles, config.cache_entries);
    let tile_service = TileService::new(backend, config.server_id.as_str())
        .with_cache(Arc::new(cache))
        .with_zoom_direction(config.zoom_direction);

    let router = create_router(tile_service, build_router_config(&config));

    let addr = config.bind_address();
    info!("Server listening on: http://{}", addr);
    info!("  curl http://{}/health", addr);
    info!(
        "  curl 'http://{}/render_tile/<image_id>/?z=0&t=0&x=0&y=0&w=256&h=256&zm=0&quality=80'",
        addr
    );

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_tiler=debug,tower_http=debug"
    } else {
        "pyramid_tiler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application Config.
fn build_router_config(config: &Config) -> RouterConfig {
    let mut router_config = RouterConfig::new()
        .with_cache_max_age(config.cache_max_age)
        .with_tracing(!config.no_tracing);

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config
}
