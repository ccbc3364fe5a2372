//! Reduces a [DepthGrid] to one proximity score per zone.
//!
//! Two formulas have been used in the field and neither is clearly better,
//! so both are kept as named policies. They also disagree on how to clamp at
//! the range ceiling: the uniform policy stops just inside it, the weighted
//! policy clamps hard. Both clamps keep their own constants.

use crate::depth_frame::DepthGrid;
use crate::zones::{partition, RoiBand, Zone};

use log::debug;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Range ceiling of the uniform policy, in meters.
pub const DEFAULT_MAX_RANGE: f32 = 4.0;

/// Fraction of `max_range` the uniform policy keeps below the ceiling. Far
/// and unmeasured cells therefore score exactly this much, never zero.
pub const UNIFORM_FAR_HEADROOM: f32 = 0.001;

/// Range ceiling of the weighted policy, in meters.
pub const DEFAULT_CAP: f32 = 5.0;

/// Keeps the inverse-distance weight finite at the zone centre.
pub const WEIGHT_EPSILON: f32 = 0.001;

/// Default number of zones across the frame.
pub const DEFAULT_ZONE_COUNT: usize = 5;

/// How the cells of a zone are combined into a single score.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum AggregationPolicy {
    /// Mean of `1 - depth / max_range` over the zone's band.
    Uniform {
        /// depth at or beyond which a cell counts as far
        max_range: f32,
    },
    /// Mean of `cap - depth`, weighted toward the zone's horizontal centre and
    /// the frame's vertical centre, normalized by `cap`.
    Weighted {
        /// depth at or beyond which a cell contributes nothing
        cap: f32,
    },
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        AggregationPolicy::Uniform {
            max_range: DEFAULT_MAX_RANGE,
        }
    }
}

/// One score in `[0, 1]` per zone, 1 being the most urgent. Replaced whole
/// every frame, never patched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProximityVector(Vec<f32>);

impl ProximityVector {
    /// Wraps scores, clamping each into `[0, 1]`. NaN becomes 0.
    pub fn new(values: Vec<f32>) -> Self {
        Self(
            values
                .into_iter()
                .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
                .collect(),
        )
    }

    /// `len` zeros: nothing anywhere.
    pub fn silent(len: usize) -> Self {
        Self(vec![0.0; len])
    }

    /// The score for zone `index`, if there is one.
    pub fn get(&self, index: usize) -> Option<f32> {
        self.0.get(index).copied()
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no zones.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The scores as a slice.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Computes [ProximityVector]s from [DepthGrid]s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneAggregator {
    zone_count: usize,
    policy: AggregationPolicy,
    roi: RoiBand,
    mirror_correction: bool,
}

impl Default for ZoneAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE_COUNT, AggregationPolicy::default(), RoiBand::default())
    }
}

impl ZoneAggregator {
    /// An aggregator with mirror correction switched on.
    pub fn new(zone_count: usize, policy: AggregationPolicy, roi: RoiBand) -> Self {
        Self {
            zone_count,
            policy,
            roi,
            mirror_correction: true,
        }
    }

    /// Whether to reverse the zone order on output. Transposed grids are
    /// mirrored left to right, so this should stay on for them.
    pub fn with_mirror_correction(self, mirror_correction: bool) -> Self {
        Self {
            mirror_correction,
            ..self
        }
    }

    /// Number of zones per vector.
    pub fn zone_count(&self) -> usize {
        self.zone_count
    }

    /// Scores every zone and applies the left/right correction, so index 0
    /// is the listener's physical left.
    pub fn aggregate(&self, grid: &DepthGrid) -> ProximityVector {
        let mut values = self.zone_values(grid);
        if self.mirror_correction {
            values.reverse();
        }
        ProximityVector::new(values)
    }

    /// Scores every zone in grid column order, without any correction.
    pub fn zone_values(&self, grid: &DepthGrid) -> Vec<f32> {
        if grid.is_empty() || self.zone_count == 0 {
            debug!(
                "empty input ({}x{} grid, {} zones), staying silent",
                grid.width(),
                grid.height(),
                self.zone_count
            );
            return vec![0.0; self.zone_count];
        }

        let rows = self.roi.rows(grid.height());
        partition(grid.width(), self.zone_count)
            .iter()
            .map(|zone| match self.policy {
                AggregationPolicy::Uniform { max_range } => {
                    uniform_average(grid, zone, rows.clone(), max_range)
                }
                AggregationPolicy::Weighted { cap } => {
                    weighted_average(grid, zone, rows.clone(), cap)
                }
            })
            .collect()
    }
}

/// Zero or negative depth means the sensor did not measure anything there.
fn is_unmeasured(depth: f32) -> bool {
    depth <= 0.0
}

/// Proximity of one cell under the uniform policy. Unmeasured cells are
/// treated as far, and every depth is held just inside `max_range`.
pub fn uniform_proximity(depth: f32, max_range: f32) -> f32 {
    let depth = if is_unmeasured(depth) { max_range } else { depth };
    let depth = depth.min(max_range * (1.0 - UNIFORM_FAR_HEADROOM));
    1.0 - (depth / max_range).clamp(0.0, 1.0)
}

fn uniform_average(grid: &DepthGrid, zone: &Zone, rows: Range<usize>, max_range: f32) -> f32 {
    let count = rows.len() * zone.columns().len();
    if count == 0 {
        return 0.0;
    }
    let sum: f32 = rows
        .flat_map(|r| grid.row(r)[zone.columns()].iter())
        .map(|&d| uniform_proximity(d, max_range))
        .sum();
    sum / count as f32
}

fn weighted_average(grid: &DepthGrid, zone: &Zone, rows: Range<usize>, cap: f32) -> f32 {
    let center_x = zone.center_x();
    let center_y = grid.height() as f32 / 2.0;

    let mut weighted = 0.0f32;
    let mut total_weight = 0.0f32;
    for r in rows {
        let row = grid.row(r);
        for c in zone.columns() {
            let depth = if is_unmeasured(row[c]) { cap } else { row[c].min(cap) };
            let weight =
                1.0 / ((c as f32 - center_x).abs() + (r as f32 - center_y).abs() + WEIGHT_EPSILON);
            weighted += (cap - depth) * weight;
            total_weight += weight;
        }
    }

    if total_weight == 0.0 {
        return 0.0;
    }
    weighted / (total_weight * cap)
}
