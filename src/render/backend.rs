//! Capability traits for rendering backends.
//!
//! The tile orchestrator never talks to an image server directly. It depends
//! on three small traits:
//!
//! - [`RenderSession`]: a handle to backend state bound to one image
//! - [`SessionDirectory`]: lists the sessions that are currently open
//! - [`RenderingService`]: prepares sessions, reports pyramid levels and
//!   renders regions
//!
//! Implementations are expected to be internally synchronized; the
//! orchestrator calls them concurrently from many requests.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::RenderError;

// =============================================================================
// Region Request
// =============================================================================

/// Parameters of a single region render call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRequest {
    /// Z plane index
    pub plane_z: u32,

    /// Timepoint index
    pub timepoint: u32,

    /// Region origin X in the selected level's pixel space
    pub origin_x: f64,

    /// Region origin Y in the selected level's pixel space
    pub origin_y: f64,

    /// Region width in pixels
    pub width: u32,

    /// Region height in pixels
    pub height: u32,

    /// Resolution level (0 = finest), `None` for no level selection
    pub level: Option<usize>,

    /// JPEG compression as a fraction in `(0, 1]`
    pub compression: f64,
}

// =============================================================================
// Traits
// =============================================================================

/// A backend rendering session bound to one image.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Identifier of the image this session renders.
    fn bound_image_id(&self) -> &str;

    /// Release the backend resources held by this session.
    ///
    /// Closing an already closed session is a no-op.
    async fn close(&self);
}

/// Lists the rendering sessions currently open on the backend.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// Session handle type.
    type Session: RenderSession + 'static;

    /// Snapshot of the open sessions.
    async fn active_sessions(&self) -> Vec<Self::Session>;
}

/// A backend able to render regions of multi-resolution images.
#[async_trait]
pub trait RenderingService: SessionDirectory {
    /// Prepare a fresh session for `image_id`.
    ///
    /// Returns `Ok(None)` if the backend has no renderable image with this
    /// identifier.
    async fn prepare_session(&self, image_id: &str)
        -> Result<Option<Self::Session>, RenderError>;

    /// Widths of the image's resolution levels, finest first.
    ///
    /// An empty list means the image has a single resolution.
    async fn pyramid_levels(&self, image_id: &str) -> Result<Vec<u32>, RenderError>;

    /// Render a region to compressed bytes.
    ///
    /// Returns `Ok(None)` when the backend produced no data.
    async fn render_region(
        &self,
        session: &Self::Session,
        region: &RegionRequest,
    ) -> Result<Option<Bytes>, RenderError>;
}
