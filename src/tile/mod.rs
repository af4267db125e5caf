//! Tile service layer.
//!
//! This module turns parsed tile requests into JPEG tiles:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              HTTP Handlers              │
//! └────────────────────┬────────────────────┘
//!                      │ TileRequest
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              Tile Service               │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileStore   │  │  TileResizer    │  │
//! │  │  (per-plane  │  │  (synthetic     │  │
//! │  │   entries)   │  │   zoom only)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │           RenderingService              │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileService`]: Main entry point, runs the per-request pipeline
//! - [`TileRequest`]: Parsed and validated request fields
//! - [`TileStore`] / [`TileCache`]: Cache gateway and its in-memory LRU store
//! - [`TileResizer`]: Scales synthetic zoom renders to the tile size
//! - [`StageTimings`]: Per-stage durations for each response

mod cache;
mod request;
mod resize;
mod service;

pub use cache::{
    CacheMode, TileCache, TileCacheKey, TileStore, DEFAULT_TILE_CACHE_CAPACITY,
    DEFAULT_TILE_CACHE_ENTRIES,
};
pub use request::{TileParams, TileRequest};
pub use resize::{
    clamp_quality, compression_fraction, TileResizer, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY,
};
pub use service::{StageTimings, TileResponse, TileService};
