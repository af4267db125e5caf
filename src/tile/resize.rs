//! Tile resizing.
//!
//! Images without a native pyramid are zoomed synthetically: the backend
//! renders a region `2^zoom` times larger than the tile, and this module scales
//! it down to the tile footprint.
//!
//! - **Exact output size**: the result is always exactly the requested tile
//!   size, even if the backend clipped the region at the image border.
//! - **Quality control**: the output is re-encoded as JPEG at the request's
//!   quality.

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::ImageReader;
use std::io::Cursor;

use crate::error::TileError;

/// Minimum allowed JPEG quality.
pub const MIN_JPEG_QUALITY: u8 = 1;

/// Maximum allowed JPEG quality.
pub const MAX_JPEG_QUALITY: u8 = 100;

// =============================================================================
// Resizer
// =============================================================================

/// Decodes rendered tiles, resizes them and re-encodes as JPEG.
#[derive(Debug, Clone)]
pub struct TileResizer {
    filter: FilterType,
}

impl Default for TileResizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TileResizer {
    /// Create a resizer using bilinear filtering.
    pub fn new() -> Self {
        Self {
            filter: FilterType::Triangle,
        }
    }

    /// Resize compressed image bytes to exactly `width` x `height`.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::DecodeError`] if the source cannot be decoded and
    /// [`TileError::EncodeError`] if the output cannot be encoded.
    pub fn resize(
        &self,
        source: &[u8],
        width: u32,
        height: u32,
        quality: u8,
    ) -> Result<Bytes, TileError> {
        let quality = clamp_quality(quality);

        let img = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| TileError::DecodeError {
                message: e.to_string(),
            })?
            .decode()
            .map_err(|e| TileError::DecodeError {
                message: e.to_string(),
            })?;

        let resized = img.resize_exact(width, height, self.filter).to_rgb8();

        let mut output = Vec::new();
        JpegEncoder::new_with_quality(&mut output, quality)
            .encode_image(&resized)
            .map_err(|e| TileError::EncodeError {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }
}

// =============================================================================
// Quality
// =============================================================================

/// Clamp quality to the valid range.
#[inline]
pub fn clamp_quality(quality: u8) -> u8 {
    quality.clamp(MIN_JPEG_QUALITY, MAX_JPEG_QUALITY)
}

/// Quality as the compression fraction renderers expect (`quality / 100`).
#[inline]
pub fn compression_fraction(quality: u8) -> f64 {
    f64::from(clamp_quality(quality)) / 100.0
}

// =============================================================================
// Tests
// =============================================================================
