//! Resolution pyramid arithmetic.
//!
//! This module turns a tile address into the region of the source image that
//! has to be rendered:
//!
//! ```text
//! level widths ──► PyramidDescriptor ──┐
//!                                      ▼
//! TileAddress ─────────────────► RegionMapper ──► ResolvedRegion
//!                                 (ZoomDirection)
//! ```
//!
//! Everything here is pure computation with no I/O.

mod descriptor;
mod region;

pub use descriptor::PyramidDescriptor;
pub use region::{RegionMapper, ResolvedRegion, TileAddress, TilePolicy, ZoomDirection};
