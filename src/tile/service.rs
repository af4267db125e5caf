//! Tile orchestration.
//!
//! The TileService is the entry point for tile requests. Each request walks
//! the same stages:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          TileService                            │
//! │  ┌─────────────────────────────────────────────────────────┐    │
//! │  │                      get_tile()                         │    │
//! │  │  1. Resolve session    4. Render region                 │    │
//! │  │  2. Map region         5. Resize (synthetic zoom only)  │    │
//! │  │  3. Check cache        6. Populate cache & respond      │    │
//! │  └─────────────────────────────────────────────────────────┘    │
//! │         │                  │                   │                │
//! │         ▼                  ▼                   ▼                │
//! │  ┌───────────────┐  ┌──────────────┐   ┌──────────────────┐     │
//! │  │SessionResolver│  │ RegionMapper │   │ TileStore        │     │
//! │  └───────────────┘  └──────────────┘   └──────────────────┘     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cache is only consulted for [`CacheMode::PlaneKeyed`] requests on
//! images with a native pyramid. Synthetic zoom always renders fresh.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::error::{RenderError, TileError};
use crate::pyramid::{
    PyramidDescriptor, RegionMapper, ResolvedRegion, TilePolicy, ZoomDirection,
};
use crate::render::{RegionRequest, RenderingService, SessionResolver};

use super::cache::{CacheMode, TileCache, TileCacheKey, TileStore};
use super::request::TileRequest;
use super::resize::{compression_fraction, TileResizer};

// =============================================================================
// Stage Timings
// =============================================================================

/// Wall-clock time spent in each stage of a tile request.
///
/// Optional stages are `None` when they did not run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub resolve_session: Duration,
    pub map_region: Duration,
    pub cache_lookup: Option<Duration>,
    pub render: Option<Duration>,
    pub resize: Option<Duration>,
    pub total: Duration,
}

impl StageTimings {
    /// Format as a `Server-Timing` header value (durations in milliseconds).
    pub fn server_timing_header(&self) -> String {
        let stages = [
            ("session", Some(self.resolve_session)),
            ("region", Some(self.map_region)),
            ("cache", self.cache_lookup),
            ("render", self.render),
            ("resize", self.resize),
            ("total", Some(self.total)),
        ];

        stages
            .iter()
            .filter_map(|(name, duration)| {
                duration.map(|d| format!("{};dur={:.3}", name, d.as_secs_f64() * 1000.0))
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StageTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.server_timing_header())
    }
}

// =============================================================================
// Tile Response
// =============================================================================

/// Response from the tile service.
#[derive(Debug, Clone)]
pub struct TileResponse {
    /// The JPEG tile data
    pub data: Bytes,

    /// Whether this tile was served from cache
    pub cache_hit: bool,

    /// Whether the tile was rendered with an already open session
    pub session_reused: bool,

    /// Strategy used to produce the tile
    pub policy: TilePolicy,

    /// The JPEG quality requested
    pub quality: u8,

    /// Per-stage durations
    pub timings: StageTimings,
}

// =============================================================================
// Tile Service
// =============================================================================

/// Service resolving tile requests against a rendering backend.
///
/// # Type Parameters
///
/// * `B` - The rendering backend (e.g. [`LocalRenderingService`](crate::render::LocalRenderingService))
///
/// # Example
///
/// ```ignore
/// use pyramid_tiler::render::LocalRenderingService;
/// use pyramid_tiler::tile::{CacheMode, TileRequest, TileService};
///
/// let service = TileService::new(LocalRenderingService::new("/data/images"), "1");
///
/// let request = TileRequest::from_params("101", &params)?;
/// let response = service.get_tile(&request, CacheMode::PlaneKeyed).await?;
///
/// println!("{} bytes, cache hit: {}", response.data.len(), response.cache_hit);
/// ```
pub struct TileService<B: RenderingService> {
    backend: Arc<B>,

    /// Cache for rendered planes
    cache: Arc<dyn TileStore>,

    resolver: SessionResolver,
    mapper: RegionMapper,
    resizer: TileResizer,

    /// Backend server identifier, part of every cache key
    server_id: Arc<str>,
}

impl<B: RenderingService> TileService<B> {
    /// Create a tile service with an in-memory cache and coarsest-first zoom.
    pub fn new(backend: B, server_id: impl Into<Arc<str>>) -> Self {
        Self::with_shared_backend(Arc::new(backend), server_id)
    }

    /// Create a tile service with a shared backend.
    pub fn with_shared_backend(backend: Arc<B>, server_id: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            cache: Arc::new(TileCache::new()),
            resolver: SessionResolver::new(),
            mapper: RegionMapper::new(ZoomDirection::default()),
            resizer: TileResizer::new(),
            server_id: server_id.into(),
        }
    }

    /// Use a different tile store.
    pub fn with_cache(mut self, cache: Arc<dyn TileStore>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a different zoom direction for native pyramids.
    pub fn with_zoom_direction(mut self, direction: ZoomDirection) -> Self {
        self.mapper = RegionMapper::new(direction);
        self
    }

    /// Get a reference to the underlying backend.
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Backend server identifier.
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Configured zoom direction.
    pub fn zoom_direction(&self) -> ZoomDirection {
        self.mapper.direction()
    }

    /// Produce the tile for `request`.
    ///
    /// # Errors
    ///
    /// - [`TileError::ImageNotFound`] if no session can be prepared for the image
    /// - [`TileError::ZoomOutOfRange`] if the zoom level has no pyramid level
    /// - [`TileError::RenderFailed`] if the backend fails or returns no data
    /// - [`TileError::DecodeError`] / [`TileError::EncodeError`] if resizing fails
    ///
    /// Cache failures are never returned; they are logged and treated as misses.
    pub async fn get_tile(
        &self,
        request: &TileRequest,
        mode: CacheMode,
    ) -> Result<TileResponse, TileError> {
        let started = Instant::now();
        let mut timings = StageTimings::default();
        let image_id = request.image_id.as_str();

        let stage = Instant::now();
        let (session, mut session_reused) = self.obtain_session(image_id).await?;
        timings.resolve_session = stage.elapsed();

        let stage = Instant::now();
        let region = self.map_region(request).await?;
        timings.map_region = stage.elapsed();

        let cache_key = (mode == CacheMode::PlaneKeyed
            && region.policy == TilePolicy::NativePyramid)
            .then(|| {
                TileCacheKey::new(
                    image_id,
                    Arc::clone(&self.server_id),
                    request.plane_z,
                    request.timepoint,
                )
            });

        if let Some(key) = &cache_key {
            let stage = Instant::now();
            let cached = match self.cache.get(key).await {
                Ok(cached) => cached,
                Err(e) => {
                    warn!(image_id, error = %e, "Tile cache lookup failed, rendering instead");
                    None
                }
            };
            timings.cache_lookup = Some(stage.elapsed());

            if let Some(data) = cached {
                timings.total = started.elapsed();
                debug!(image_id, timings = %timings, "Tile served from cache");
                return Ok(TileResponse {
                    data,
                    cache_hit: true,
                    session_reused,
                    policy: region.policy,
                    quality: request.quality,
                    timings,
                });
            }
        }

        let region_request = RegionRequest {
            plane_z: request.plane_z,
            timepoint: request.timepoint,
            origin_x: region.origin_x,
            origin_y: region.origin_y,
            width: region.region_width,
            height: region.region_height,
            level: region.source_level,
            compression: compression_fraction(request.quality),
        };

        let stage = Instant::now();
        let rendered = match self.backend.render_region(&session, &region_request).await {
            Err(RenderError::SessionClosed) if session_reused => {
                warn!(
                    image_id,
                    "Reused rendering session was closed, retrying with a fresh session"
                );
                let fresh = self.prepare_session(image_id).await?;
                session_reused = false;
                self.backend.render_region(&fresh, &region_request).await
            }
            other => other,
        };
        let rendered = match rendered {
            Ok(Some(data)) if !data.is_empty() => data,
            Ok(_) => return Err(TileError::render(image_id, RenderError::NoData)),
            Err(e) => return Err(TileError::render(image_id, e)),
        };
        timings.render = Some(stage.elapsed());

        let data = if region.needs_resize() {
            let stage = Instant::now();
            let resized = self
                .resize_blocking(rendered, region.tile_width, region.tile_height, request.quality)
                .await?;
            timings.resize = Some(stage.elapsed());
            resized
        } else {
            rendered
        };

        if let Some(key) = cache_key {
            if let Err(e) = self.cache.put(key, data.clone()).await {
                warn!(image_id, error = %e, "Failed to store tile in cache");
            }
        }

        timings.total = started.elapsed();
        debug!(
            image_id,
            policy = region.policy.name(),
            session_reused,
            bytes = data.len(),
            timings = %timings,
            "Tile rendered"
        );

        Ok(TileResponse {
            data,
            cache_hit: false,
            session_reused,
            policy: region.policy,
            quality: request.quality,
            timings,
        })
    }

    async fn resize_blocking(
        &self,
        rendered: Bytes,
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let resizer = self.resizer.clone();

        tokio::task::spawn_blocking(move || resizer.resize(&rendered, width, height, quality))
            .await
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?
    }

    /// Reuse an open session bound to the image, or prepare a fresh one.
    async fn obtain_session(&self, image_id: &str) -> Result<(B::Session, bool), TileError> {
        let sessions = self.backend.active_sessions().await;
        let resolution = self.resolver.resolve(image_id, sessions).await;

        if resolution.released > 0 {
            debug!(image_id, released = resolution.released, "Released unrelated sessions");
        }

        match resolution.session {
            Some(session) => {
                debug!(image_id, "Reusing rendering session");
                Ok((session, true))
            }
            None => Ok((self.prepare_session(image_id).await?, false)),
        }
    }

    async fn prepare_session(&self, image_id: &str) -> Result<B::Session, TileError> {
        self.backend
            .prepare_session(image_id)
            .await
            .map_err(|e| TileError::render(image_id, e))?
            .ok_or_else(|| TileError::ImageNotFound {
                image_id: image_id.to_string(),
            })
    }

    async fn map_region(&self, request: &TileRequest) -> Result<ResolvedRegion, TileError> {
        let widths = self
            .backend
            .pyramid_levels(&request.image_id)
            .await
            .map_err(|e| TileError::render(request.image_id.as_str(), e))?;

        let descriptor = PyramidDescriptor::build(&widths);
        if descriptor.is_none() && !widths.is_empty() {
            warn!(
                image_id = %request.image_id,
                ?widths,
                "Ignoring inconsistent pyramid level widths"
            );
        }

        self.mapper.map(&request.address(), descriptor.as_ref())
    }
}

// =============================================================================
// Tests
// =============================================================================
