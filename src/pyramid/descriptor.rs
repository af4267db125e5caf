//! Pyramid descriptor: per-level scale fractions.
//!
//! A multi-resolution image stores the same plane at several resolutions.
//! The backend reports the width of every level, finest first. From those
//! widths we derive the scale of each level relative to full resolution:
//!
//! ```text
//! level:   0      1      2
//! width:   4096   1024   256
//! scale:   1.0    0.25   0.0625
//! ```

/// Scale information for the resolution levels of one image.
///
/// Only images that actually expose more than a single plane resolution get
/// a descriptor; see [`PyramidDescriptor::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidDescriptor {
    /// Level widths in pixels, index 0 = full resolution
    widths: Vec<u32>,
}

impl PyramidDescriptor {
    /// Build a descriptor from backend level widths (finest first).
    ///
    /// Returns `None` when the image has no pyramid (empty list) or when the
    /// widths are not a valid pyramid: a zero width, or a level wider than
    /// the one before it.
    pub fn build(level_widths: &[u32]) -> Option<Self> {
        let (&first, rest) = level_widths.split_first()?;
        if first == 0 {
            return None;
        }

        let mut previous = first;
        for &width in rest {
            if width == 0 || width > previous {
                return None;
            }
            previous = width;
        }

        Some(Self {
            widths: level_widths.to_vec(),
        })
    }

    /// Number of declared levels.
    pub fn level_count(&self) -> usize {
        self.widths.len()
    }

    /// Width of a level in pixels.
    pub fn level_width(&self, level: usize) -> Option<u32> {
        self.widths.get(level).copied()
    }

    /// Scale of `level` relative to full resolution, in `(0, 1]`.
    ///
    /// Returns `None` if the level is out of range.
    pub fn scale_fraction(&self, level: usize) -> Option<f64> {
        let width = self.level_width(level)?;
        Some(width as f64 / self.widths[0] as f64)
    }

    /// Scale fractions of all levels, finest first.
    pub fn scale_fractions(&self) -> impl Iterator<Item = f64> + '_ {
        let full = self.widths[0] as f64;
        self.widths.iter().map(move |&w| w as f64 / full)
    }
}
