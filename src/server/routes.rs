//! Router configuration.
//!
//! # Route Structure
//!
//! ```text
//! /                                   - Welcome text
//! /health                             - Health check
//! /render_tile/{image_id}/            - Tile, plane-keyed cache
//! /render_tile_catmaid/{image_id}/    - Tile, no cache
//! ```
//!
//! Both tile routes also answer without the trailing slash.
//!
//! # Example
//!
//! ```ignore
//! use pyramid_tiler::render::LocalRenderingService;
//! use pyramid_tiler::server::{create_router, RouterConfig};
//! use pyramid_tiler::tile::TileService;
//!
//! let tile_service = TileService::new(LocalRenderingService::new("/data/images"), "1");
//!
//! let config = RouterConfig::new()
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(tile_service, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:4080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{routing::get, Router};
use http::header::CONTENT_TYPE;
use http::Method;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{
    health_handler, index_handler, render_tile_catmaid_handler, render_tile_handler, AppState,
};
use crate::render::RenderingService;
use crate::tile::TileService;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Cache-Control max-age in seconds
    pub cache_max_age: u32,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RouterConfig {
    /// Create a router configuration.
    ///
    /// By default CORS allows any origin, max-age is one hour and request
    /// tracing is enabled.
    pub fn new() -> Self {
        Self {
            cors_origins: None,
            cache_max_age: 3600,
            enable_tracing: true,
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Set the Cache-Control max-age in seconds.
    pub fn with_cache_max_age(mut self, seconds: u32) -> Self {
        self.cache_max_age = seconds;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the application router.
pub fn create_router<B>(tile_service: TileService<B>, config: RouterConfig) -> Router
where
    B: RenderingService + 'static,
{
    let app_state = AppState::with_cache_max_age(tile_service, config.cache_max_age);
    let cors = build_cors_layer(&config);

    let router = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/render_tile/{image_id}", get(render_tile_handler::<B>))
        .route("/render_tile/{image_id}/", get(render_tile_handler::<B>))
        .route(
            "/render_tile_catmaid/{image_id}",
            get(render_tile_catmaid_handler::<B>),
        )
        .route(
            "/render_tile_catmaid/{image_id}/",
            get(render_tile_catmaid_handler::<B>),
        )
        .with_state(app_state)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}
