//! HTTP request handlers for the tile API.
//!
//! # Endpoints
//!
//! - `GET /` - Welcome text
//! - `GET /health` - Health check endpoint
//! - `GET /render_tile/{image_id}/` - Tile, plane-keyed cache
//! - `GET /render_tile_catmaid/{image_id}/` - Tile, no cache

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::error::{RenderError, TileError};
use crate::render::RenderingService;
use crate::tile::{CacheMode, TileParams, TileRequest, TileResponse, TileService};

/// Response header: whether the tile came from the cache.
pub const CACHE_HIT_HEADER: &str = "x-tile-cache-hit";

/// Response header: whether an open rendering session was reused.
pub const SESSION_REUSED_HEADER: &str = "x-tile-session-reused";

/// Response header: which policy produced the tile.
pub const POLICY_HEADER: &str = "x-tile-policy";

/// Response header: per-stage durations.
pub const SERVER_TIMING_HEADER: &str = "server-timing";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state containing the tile service.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<B: RenderingService> {
    /// The tile service for processing tile requests
    pub tile_service: Arc<TileService<B>>,

    /// Cache-Control max-age in seconds (defaults to 1 hour)
    pub cache_max_age: u32,
}

impl<B: RenderingService> AppState<B> {
    /// Create a new application state with the given tile service.
    pub fn new(tile_service: TileService<B>) -> Self {
        Self::with_cache_max_age(tile_service, 3600)
    }

    /// Create a new application state with custom cache max-age.
    pub fn with_cache_max_age(tile_service: TileService<B>, cache_max_age: u32) -> Self {
        Self {
            tile_service: Arc::new(tile_service),
            cache_max_age,
        }
    }
}

impl<B: RenderingService> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            tile_service: Arc::clone(&self.tile_service),
            cache_max_age: self.cache_max_age,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "bad_request")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// HTTP status and error type identifier for a tile error.
pub fn error_status(err: &TileError) -> (StatusCode, &'static str) {
    match err {
        TileError::RequestMalformed { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
        TileError::ImageNotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
        TileError::ZoomOutOfRange { .. } => (StatusCode::BAD_REQUEST, "zoom_out_of_range"),
        TileError::RenderFailed { source, .. } => match source {
            RenderError::NoData => (StatusCode::NOT_FOUND, "no_tile_data"),
            RenderError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RenderError::SessionClosed | RenderError::Backend(_) => {
                (StatusCode::BAD_GATEWAY, "render_error")
            }
        },
        TileError::DecodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "decode_error"),
        TileError::EncodeError { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "encode_error"),
    }
}

/// Convert TileError to HTTP response.
///
/// Logged by severity: 5xx at ERROR, 404 at DEBUG, other 4xx at WARN.
impl IntoResponse for TileError {
    fn into_response(self) -> Response {
        let (status, error_type) = error_status(&self);
        let message = self.to_string();

        if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                message
            );
        } else if status == StatusCode::NOT_FOUND {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Resource not found: {}",
                message
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                message
            );
        }

        let error_response = ErrorResponse::with_status(error_type, message, status);

        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle requests to the root path.
pub async fn index_handler() -> &'static str {
    "Welcome to the pyramid tiler. Tiles are served under /render_tile/{image_id}/"
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Handle tile requests with the plane-keyed cache.
///
/// # Endpoint
///
/// `GET /render_tile/{image_id}/?z=&t=&x=&y=&w=&h=&zm=&quality=`
///
/// # Response
///
/// - `200 OK`: JPEG tile with `Content-Type: image/jpeg`
/// - `400 Bad Request`: Malformed field or zoom level out of range
/// - `404 Not Found`: Unknown image, or the backend returned no data
/// - `502 Bad Gateway`: Backend render failure
/// - `500 Internal Server Error`: Resize failure
///
/// # Headers
///
/// - `Cache-Control: public, max-age={cache_max_age}`
/// - `X-Tile-Cache-Hit`, `X-Tile-Session-Reused`, `X-Tile-Policy`
/// - `Server-Timing`
pub async fn render_tile_handler<B: RenderingService + 'static>(
    State(state): State<AppState<B>>,
    Path(image_id): Path<String>,
    Query(params): Query<TileParams>,
) -> Result<Response, TileError> {
    serve_tile(&state, image_id, &params, CacheMode::PlaneKeyed).await
}

/// Handle geometry-precise tile requests. Never touches the cache.
///
/// # Endpoint
///
/// `GET /render_tile_catmaid/{image_id}/?z=&t=&x=&y=&w=&h=&zm=&quality=`
///
/// Responses are the same as [`render_tile_handler`].
pub async fn render_tile_catmaid_handler<B: RenderingService + 'static>(
    State(state): State<AppState<B>>,
    Path(image_id): Path<String>,
    Query(params): Query<TileParams>,
) -> Result<Response, TileError> {
    serve_tile(&state, image_id, &params, CacheMode::Bypass).await
}

async fn serve_tile<B: RenderingService + 'static>(
    state: &AppState<B>,
    image_id: String,
    params: &TileParams,
    mode: CacheMode,
) -> Result<Response, TileError> {
    let request = TileRequest::from_params(image_id, params)?;
    let response = state.tile_service.get_tile(&request, mode).await?;
    Ok(tile_response(response, state.cache_max_age))
}

fn tile_response(response: TileResponse, cache_max_age: u32) -> Response {
    let headers = [
        (header::CONTENT_TYPE, "image/jpeg".to_string()),
        (
            header::CACHE_CONTROL,
            format!("public, max-age={}", cache_max_age),
        ),
        (
            HeaderName::from_static(CACHE_HIT_HEADER),
            response.cache_hit.to_string(),
        ),
        (
            HeaderName::from_static(SESSION_REUSED_HEADER),
            response.session_reused.to_string(),
        ),
        (
            HeaderName::from_static(POLICY_HEADER),
            response.policy.name().to_string(),
        ),
        (
            HeaderName::from_static(SERVER_TIMING_HEADER),
            response.timings.server_timing_header(),
        ),
    ];

    (StatusCode::OK, headers, Body::from(response.data)).into_response()
}
