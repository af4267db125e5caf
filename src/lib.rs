//! # Pyramid Tiler
//!
//! A deep-zoom tile server for multi-resolution microscopy images.
//!
//! Clients ask for a tile by origin, size and zoom index. The server decides
//! how to produce it from a rendering backend:
//!
//! - **Native pyramid**: when the image has precomputed resolution levels, the
//!   zoom index selects a level and the region is rendered there directly.
//! - **Synthetic zoom**: otherwise a region `2^zoom` times larger is rendered at
//!   full resolution and scaled down to the tile size.
//!
//! ## Features
//!
//! - **Session reuse**: open rendering sessions bound to the same image are
//!   reused; sessions of other images are released
//! - **Plane-keyed caching**: rendered planes are cached per image, server, Z
//!   plane and timepoint
//! - **Stage timings**: every response carries a `Server-Timing` header
//!
//! ## Architecture
//!
//! - [`pyramid`] - Pyramid descriptors and tile-to-region mapping
//! - [`render`] - Rendering backend traits, session resolver and local backend
//! - [`tile`] - Request parsing, cache, resize and the tile service
//! - [`server`] - Axum-based HTTP server and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use pyramid_tiler::{create_router, LocalRenderingService, RouterConfig, TileService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = LocalRenderingService::new("/data/images");
//!     let tile_service = TileService::new(backend, "1");
//!     let router = create_router(tile_service, RouterConfig::new());
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:4080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod pyramid;
pub mod render;
pub mod server;
pub mod tile;

// Re-export commonly used types
pub use config::Config;
pub use error::{CacheError, RenderError, TileError};
pub use pyramid::{
    PyramidDescriptor, RegionMapper, ResolvedRegion, TileAddress, TilePolicy, ZoomDirection,
};
pub use render::{
    LocalRenderingService, LocalSession, RegionRequest, RenderSession, RenderingService,
    SessionDirectory, SessionResolver,
};
pub use server::{create_router, AppState, ErrorResponse, HealthResponse, RouterConfig};
pub use tile::{
    CacheMode, StageTimings, TileCache, TileCacheKey, TileParams, TileRequest, TileResponse,
    TileService, TileStore,
};
