//! Mapping of tile addresses onto source regions.
//!
//! Two policies exist, selected by whether the image has a pyramid:
//!
//! - **Synthetic zoom** (no pyramid): the tile is always rendered from the
//!   full-resolution plane. Each zoom step doubles the source region, which is
//!   later downsampled into the tile footprint.
//! - **Native pyramid**: the zoom level selects a backend resolution level and
//!   the tile is rendered at that level with no resizing.
//!
//! Backend levels run finest (0) to coarsest. Tiling clients disagree on the
//! direction of their zoom index, so the direction is an explicit
//! [`ZoomDirection`] on the mapper.

use std::fmt;
use std::str::FromStr;

use crate::error::TileError;

use super::descriptor::PyramidDescriptor;

// =============================================================================
// Zoom Direction
// =============================================================================

/// How a client zoom index relates to backend resolution levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ZoomDirection {
    /// Zoom 0 is the coarsest level: `level = level_count - 1 - zoom`.
    #[default]
    CoarsestFirst,

    /// Zoom 0 is the finest level: `level = zoom`.
    FinestFirst,
}

impl ZoomDirection {
    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            ZoomDirection::CoarsestFirst => "coarsest-first",
            ZoomDirection::FinestFirst => "finest-first",
        }
    }
}

impl fmt::Display for ZoomDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ZoomDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "coarsest-first" | "coarsest" => Ok(ZoomDirection::CoarsestFirst),
            "finest-first" | "finest" => Ok(ZoomDirection::FinestFirst),
            other => Err(format!(
                "unknown zoom direction '{}' (expected coarsest-first or finest-first)",
                other
            )),
        }
    }
}

// =============================================================================
// Tile Address & Resolved Region
// =============================================================================

/// Geometry part of a tile request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileAddress {
    /// Origin X within the addressed level
    pub x: f64,

    /// Origin Y within the addressed level
    pub y: f64,

    /// Output tile width in pixels
    pub tile_width: u32,

    /// Output tile height in pixels
    pub tile_height: u32,

    /// Client zoom index
    pub zoom_level: u32,
}

/// Which rendering strategy produced a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilePolicy {
    /// Full-resolution render of an enlarged region, resized afterwards
    SyntheticZoom,

    /// Render at a native pyramid level, returned verbatim
    NativePyramid,
}

impl TilePolicy {
    /// Short name used in headers and logs.
    pub fn name(&self) -> &'static str {
        match self {
            TilePolicy::SyntheticZoom => "synthetic",
            TilePolicy::NativePyramid => "pyramid",
        }
    }
}

/// The source region to render for a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRegion {
    /// Strategy that produced this region
    pub policy: TilePolicy,

    /// Backend resolution level (`None` = let the backend use full resolution)
    pub source_level: Option<usize>,

    /// Origin X in the source level's pixel space
    pub origin_x: f64,

    /// Origin Y in the source level's pixel space
    pub origin_y: f64,

    /// Width of the region to render
    pub region_width: u32,

    /// Height of the region to render
    pub region_height: u32,

    /// Width of the tile handed back to the client
    pub tile_width: u32,

    /// Height of the tile handed back to the client
    pub tile_height: u32,
}

impl ResolvedRegion {
    /// Whether rendered bytes must be resized to the tile size.
    pub fn needs_resize(&self) -> bool {
        self.policy == TilePolicy::SyntheticZoom
    }
}

// =============================================================================
// Region Mapper
// =============================================================================

/// Computes the source region and level for tile addresses.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionMapper {
    direction: ZoomDirection,
}

impl RegionMapper {
    /// Create a mapper using the given zoom direction.
    pub fn new(direction: ZoomDirection) -> Self {
        Self { direction }
    }

    /// The zoom direction this mapper applies.
    pub fn direction(&self) -> ZoomDirection {
        self.direction
    }

    /// Map a tile address onto a source region.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::ZoomOutOfRange`] if the zoom level does not address
    /// a level of the pyramid, or (without a pyramid) if the scaled region
    /// would not fit the pixel range.
    pub fn map(
        &self,
        address: &TileAddress,
        pyramid: Option<&PyramidDescriptor>,
    ) -> Result<ResolvedRegion, TileError> {
        match pyramid {
            Some(pyramid) => self.map_native(address, pyramid),
            None => Self::map_synthetic(address),
        }
    }

    /// Backend level for a zoom index, if the zoom addresses one.
    pub fn source_level(&self, zoom_level: u32, level_count: usize) -> Option<usize> {
        let zoom = usize::try_from(zoom_level).ok()?;
        if zoom >= level_count {
            return None;
        }
        match self.direction {
            ZoomDirection::CoarsestFirst => Some(level_count - 1 - zoom),
            ZoomDirection::FinestFirst => Some(zoom),
        }
    }

    fn map_synthetic(address: &TileAddress) -> Result<ResolvedRegion, TileError> {
        let out_of_range = || TileError::ZoomOutOfRange {
            zoom_level: address.zoom_level,
            level_count: 0,
        };

        let factor = 1u32
            .checked_shl(address.zoom_level)
            .ok_or_else(out_of_range)?;
        let region_width = address
            .tile_width
            .checked_mul(factor)
            .ok_or_else(out_of_range)?;
        let region_height = address
            .tile_height
            .checked_mul(factor)
            .ok_or_else(out_of_range)?;

        Ok(ResolvedRegion {
            policy: TilePolicy::SyntheticZoom,
            source_level: None,
            origin_x: address.x,
            origin_y: address.y,
            region_width,
            region_height,
            tile_width: address.tile_width,
            tile_height: address.tile_height,
        })
    }

    fn map_native(
        &self,
        address: &TileAddress,
        pyramid: &PyramidDescriptor,
    ) -> Result<ResolvedRegion, TileError> {
        let level_count = pyramid.level_count();
        let out_of_range = || TileError::ZoomOutOfRange {
            zoom_level: address.zoom_level,
            level_count,
        };

        let source_level = self
            .source_level(address.zoom_level, level_count)
            .ok_or_else(out_of_range)?;

        // Origins scale by the zoom level's fraction, matching the level choice.
        let scale = pyramid
            .scale_fraction(address.zoom_level as usize)
            .ok_or_else(out_of_range)?;

        Ok(ResolvedRegion {
            policy: TilePolicy::NativePyramid,
            source_level: Some(source_level),
            origin_x: address.x * scale,
            origin_y: address.y * scale,
            region_width: address.tile_width,
            region_height: address.tile_height,
            tile_width: address.tile_width,
            tile_height: address.tile_height,
        })
    }
}
