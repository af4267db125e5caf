use thiserror::Error;

/// Errors reported by a rendering backend.
#[derive(Debug, Clone, Error)]
pub enum RenderError {
    /// The backend has no image with this identifier
    #[error("Image not found: {0}")]
    NotFound(String),

    /// The session was closed before (or while) it was used
    #[error("Rendering session is closed")]
    SessionClosed,

    /// The render call completed but produced no bytes
    #[error("Backend returned no data for the requested region")]
    NoData,

    /// Any other backend failure (I/O, codec, transport)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Errors from a tile cache collaborator.
///
/// Cache errors are never fatal to a tile request: the orchestrator logs them
/// and falls back to rendering.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The cache store could not be reached or refused the operation
    #[error("Tile cache unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur while serving a tile
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// A required request field is missing or not parseable
    #[error("Malformed request field '{field}': {reason}")]
    RequestMalformed { field: &'static str, reason: String },

    /// The backend cannot prepare a renderable image for this identifier
    #[error("Image not found: {image_id}")]
    ImageNotFound { image_id: String },

    /// Zoom level does not address a level of this image
    #[error("Zoom level {zoom_level} out of range (image has {level_count} levels)")]
    ZoomOutOfRange { zoom_level: u32, level_count: usize },

    /// The backend render call failed or returned nothing
    #[error("Failed to render image {image_id}: {source}")]
    RenderFailed {
        image_id: String,
        #[source]
        source: RenderError,
    },

    /// Rendered bytes could not be decoded for resizing
    #[error("Failed to decode tile: {message}")]
    DecodeError { message: String },

    /// Resized tile could not be encoded
    #[error("Failed to encode tile: {message}")]
    EncodeError { message: String },
}

impl TileError {
    /// Shorthand for a malformed request field.
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        TileError::RequestMalformed {
            field,
            reason: reason.into(),
        }
    }

    /// Wrap a backend error for the given image.
    pub fn render(image_id: impl Into<String>, source: RenderError) -> Self {
        TileError::RenderFailed {
            image_id: image_id.into(),
            source,
        }
    }
}
