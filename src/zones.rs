//! How a depth grid is cut up: vertical zones across its width and the
//! eye-level band of rows that takes part in aggregation.

use std::ops::Range;

/// Fraction of the grid height, centred vertically, that is aggregated.
pub const DEFAULT_ROI_BAND_FRACTION: f32 = 0.25;

/// A vertical slice of the grid, owning columns `start_x..end_x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    /// position of the zone, 0 is the lowest column range
    pub index: usize,
    /// first column, inclusive
    pub start_x: usize,
    /// last column, exclusive
    pub end_x: usize,
}

impl Zone {
    /// The columns this zone covers.
    pub fn columns(&self) -> Range<usize> {
        self.start_x..self.end_x
    }

    /// Horizontal centre of the zone, in column units.
    pub fn center_x(&self) -> f32 {
        (self.start_x + self.end_x) as f32 / 2.0
    }
}

/// Splits `width` columns into `zone_count` contiguous zones of
/// `width / zone_count` columns each. The last zone absorbs the remainder, so
/// the zones always cover `0..width` exactly. Zero zones gives an empty list.
pub fn partition(width: usize, zone_count: usize) -> Vec<Zone> {
    if zone_count == 0 {
        return Vec::new();
    }
    let section = width / zone_count;
    (0..zone_count)
        .map(|index| {
            let start_x = index * section;
            let end_x = if index == zone_count - 1 {
                width
            } else {
                start_x + section
            };
            Zone {
                index,
                start_x,
                end_x,
            }
        })
        .collect()
}

/// The band of rows around the vertical middle of the grid that counts as
/// "eye level". Ceiling and floor clutter outside it is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoiBand {
    fraction: f32,
}

impl Default for RoiBand {
    fn default() -> Self {
        Self::new(DEFAULT_ROI_BAND_FRACTION)
    }
}

impl RoiBand {
    /// A band covering `fraction` of the height, clamped into `[0, 1]`.
    pub fn new(fraction: f32) -> Self {
        Self {
            fraction: if fraction.is_nan() {
                DEFAULT_ROI_BAND_FRACTION
            } else {
                fraction.clamp(0.0, 1.0)
            },
        }
    }

    /// Rows `floor(h(1-f)/2)..ceil(h(1+f)/2)` of a grid `height` rows tall.
    pub fn rows(&self, height: usize) -> Range<usize> {
        let h = height as f64;
        let f = self.fraction as f64;
        let start = (h * (1.0 - f) / 2.0).floor() as usize;
        let end = ((h * (1.0 + f) / 2.0).ceil() as usize).min(height);
        start.min(end)..end
    }
}
