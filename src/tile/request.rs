//! Tile request parsing.
//!
//! Tile requests arrive as a flat set of string fields:
//!
//! | field     | meaning                        | parsed as                |
//! |-----------|--------------------------------|--------------------------|
//! | `z`       | Z plane                        | non-negative integer     |
//! | `t`       | timepoint                      | non-negative integer     |
//! | `x`, `y`  | origin within the zoom level   | non-negative float       |
//! | `w`, `h`  | tile size                      | float, truncated, `> 0`  |
//! | `zm`      | zoom level                     | non-negative integer     |
//! | `quality` | JPEG quality                   | number, clamped to 1-100 |
//!
//! All fields are required.

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::TileError;
use crate::pyramid::TileAddress;

use super::resize::{MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};

/// Raw tile request fields as they arrive in a query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TileParams {
    pub z: Option<String>,
    pub t: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    pub w: Option<String>,
    pub h: Option<String>,
    pub zm: Option<String>,
    pub quality: Option<String>,
}

impl TileParams {
    /// Collect fields from a key/value map.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let field = |name: &str| map.get(name).cloned();
        Self {
            z: field("z"),
            t: field("t"),
            x: field("x"),
            y: field("y"),
            w: field("w"),
            h: field("h"),
            zm: field("zm"),
            quality: field("quality"),
        }
    }
}

/// A parsed, validated tile request.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    /// Image identifier
    pub image_id: String,

    /// Z plane index
    pub plane_z: u32,

    /// Timepoint index
    pub timepoint: u32,

    /// Origin X within the addressed level
    pub x: f64,

    /// Origin Y within the addressed level
    pub y: f64,

    /// Tile width in pixels
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Client zoom index
    pub zoom_level: u32,

    /// JPEG quality (1-100)
    pub quality: u8,
}

impl TileRequest {
    /// Parse a request for `image_id` from raw fields.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::RequestMalformed`] naming the first missing or
    /// unparseable field.
    pub fn from_params(
        image_id: impl Into<String>,
        params: &TileParams,
    ) -> Result<Self, TileError> {
        let image_id = image_id.into();
        if image_id.is_empty() {
            return Err(TileError::malformed("image_id", "must not be empty"));
        }

        Ok(Self {
            image_id,
            plane_z: parse_index("z", params.z.as_deref())?,
            timepoint: parse_index("t", params.t.as_deref())?,
            x: parse_origin("x", params.x.as_deref())?,
            y: parse_origin("y", params.y.as_deref())?,
            tile_width: parse_size("w", params.w.as_deref())?,
            tile_height: parse_size("h", params.h.as_deref())?,
            zoom_level: parse_index("zm", params.zm.as_deref())?,
            quality: parse_quality("quality", params.quality.as_deref())?,
        })
    }

    /// The geometry part of this request.
    pub fn address(&self) -> TileAddress {
        TileAddress {
            x: self.x,
            y: self.y,
            tile_width: self.tile_width,
            tile_height: self.tile_height,
            zoom_level: self.zoom_level,
        }
    }
}

fn parse_number(field: &'static str, value: Option<&str>) -> Result<f64, TileError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| TileError::malformed(field, "missing"))?;

    let number: f64 = raw
        .parse()
        .map_err(|_| TileError::malformed(field, format!("'{}' is not a number", raw)))?;

    if !number.is_finite() {
        return Err(TileError::malformed(field, format!("'{}' is not finite", raw)));
    }
    Ok(number)
}

fn parse_index(field: &'static str, value: Option<&str>) -> Result<u32, TileError> {
    let number = parse_number(field, value)?;
    if number < 0.0 || number.fract() != 0.0 || number > f64::from(u32::MAX) {
        return Err(TileError::malformed(
            field,
            format!("{} is not a non-negative integer", number),
        ));
    }
    Ok(number as u32)
}

fn parse_origin(field: &'static str, value: Option<&str>) -> Result<f64, TileError> {
    let number = parse_number(field, value)?;
    if number < 0.0 {
        return Err(TileError::malformed(field, format!("{} is negative", number)));
    }
    Ok(number)
}

fn parse_size(field: &'static str, value: Option<&str>) -> Result<u32, TileError> {
    let number = parse_number(field, value)?.trunc();
    if number < 1.0 || number > f64::from(u32::MAX) {
        return Err(TileError::malformed(
            field,
            format!("{} is not a positive size", number),
        ));
    }
    Ok(number as u32)
}

fn parse_quality(field: &'static str, value: Option<&str>) -> Result<u8, TileError> {
    let number = parse_number(field, value)?.round();
    let clamped = number.clamp(f64::from(MIN_JPEG_QUALITY), f64::from(MAX_JPEG_QUALITY));
    Ok(clamped as u8)
}
