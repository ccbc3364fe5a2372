//! Runtime configuration, loadable from a RON file such as:
//!
//! ```text
//! (
//!     zone_count: 5,
//!     aggregation: Weighted(cap: 5.0),
//!     roi_band_fraction: 0.25,
//!     smoothing_window: Some(3),
//!     tick_interval_secs: 0.2,
//! )
//! ```
//!
//! Any field left out keeps its default.

use crate::aggregator::{AggregationPolicy, ZoneAggregator, DEFAULT_ZONE_COUNT};
use crate::depth_frame::Orientation;
use crate::error::SonifyError;
use crate::zones::{RoiBand, DEFAULT_ROI_BAND_FRACTION};

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

/// Seconds between two cues of a sweep.
pub const DEFAULT_TICK_INTERVAL_SECS: f32 = 0.5;

/// Everything that can be tuned about the pipeline and the sweep.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SonifyConfig {
    /// Zones across the frame, and so audio channels in the sweep
    pub zone_count: usize,
    /// How each zone's cells are combined
    pub aggregation: AggregationPolicy,
    /// Fraction of the grid height, centred, that is aggregated
    pub roi_band_fraction: f32,
    /// Odd box-filter window applied before aggregation, if any
    pub smoothing_window: Option<usize>,
    /// Rows and columns to decimate the grid towards after smoothing, if any
    pub downsample_target: Option<usize>,
    /// Seconds between cues
    pub tick_interval_secs: f32,
    /// How depth buffers are read
    pub orientation: Orientation,
    /// Reverse zone order so index 0 is the listener's left
    pub mirror_correction: bool,
}

impl Default for SonifyConfig {
    fn default() -> Self {
        Self {
            zone_count: DEFAULT_ZONE_COUNT,
            aggregation: AggregationPolicy::default(),
            roi_band_fraction: DEFAULT_ROI_BAND_FRACTION,
            smoothing_window: None,
            downsample_target: None,
            tick_interval_secs: DEFAULT_TICK_INTERVAL_SECS,
            orientation: Orientation::default(),
            mirror_correction: true,
        }
    }
}

impl SonifyConfig {
    /// Reads and validates a RON config file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SonifyError> {
        let text = fs::read_to_string(path)?;
        text.parse()
    }

    /// Writes the config out as pretty RON.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), SonifyError> {
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Checks the values a sweep cannot run with.
    pub fn validate(&self) -> Result<(), SonifyError> {
        if let Some(window) = self.smoothing_window {
            if window == 0 || window % 2 == 0 {
                return Err(SonifyError::InvalidConfig(format!(
                    "smoothing window must be odd, got {window}"
                )));
            }
        }
        if self.downsample_target == Some(0) {
            return Err(SonifyError::InvalidConfig(
                "downsample target must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.roi_band_fraction) {
            return Err(SonifyError::InvalidConfig(format!(
                "roi band fraction must be within [0, 1], got {}",
                self.roi_band_fraction
            )));
        }
        if checked_seconds(self.tick_interval_secs, "tick interval")?.is_zero() {
            return Err(SonifyError::InvalidConfig(format!(
                "tick interval must be positive, got {}",
                self.tick_interval_secs
            )));
        }
        let ceiling = match self.aggregation {
            AggregationPolicy::Uniform { max_range } => max_range,
            AggregationPolicy::Weighted { cap } => cap,
        };
        if !(ceiling > 0.0) || !ceiling.is_finite() {
            return Err(SonifyError::InvalidConfig(format!(
                "range ceiling must be positive, got {ceiling}"
            )));
        }
        Ok(())
    }

    /// The cadence of the sweep. An interval that never went through
    /// [SonifyConfig::validate] and cannot be used falls back to the default.
    pub fn tick_interval(&self) -> Duration {
        match checked_seconds(self.tick_interval_secs, "tick interval") {
            Ok(interval) if !interval.is_zero() => interval,
            _ => Duration::from_secs_f32(DEFAULT_TICK_INTERVAL_SECS),
        }
    }

    /// The aggregator this config describes.
    pub fn aggregator(&self) -> ZoneAggregator {
        ZoneAggregator::new(
            self.zone_count,
            self.aggregation,
            RoiBand::new(self.roi_band_fraction),
        )
        .with_mirror_correction(self.mirror_correction)
    }
}

/// Converts user-supplied seconds into a [Duration], rejecting negative,
/// NaN, infinite and out of range values instead of panicking on them.
pub fn checked_seconds(secs: f32, what: &str) -> Result<Duration, SonifyError> {
    Duration::try_from_secs_f32(secs).map_err(|_| {
        SonifyError::InvalidConfig(format!(
            "{what} must be a usable number of seconds, got {secs}"
        ))
    })
}

impl std::str::FromStr for SonifyConfig {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: SonifyConfig = ron::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SonifyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.zone_count, 5);
        assert_eq!(config.tick_interval(), Duration::from_millis(500));
    }

    #[test]
    fn partial_files_keep_defaults() {
        let config: SonifyConfig = "(zone_count: 7, aggregation: Weighted(cap: 5.0))"
            .parse()
            .unwrap();
        assert_eq!(config.zone_count, 7);
        assert_eq!(config.aggregation, AggregationPolicy::Weighted { cap: 5.0 });
        assert_eq!(config.roi_band_fraction, DEFAULT_ROI_BAND_FRACTION);
        assert_eq!(config.orientation, Orientation::Transposed);
    }

    #[test]
    fn even_windows_are_rejected() {
        let res = "(smoothing_window: Some(4))".parse::<SonifyConfig>();
        assert!(matches!(res, Err(SonifyError::InvalidConfig(_))));
        assert!("(smoothing_window: Some(5))".parse::<SonifyConfig>().is_ok());
    }

    #[test]
    fn bad_numbers_are_rejected() {
        for text in [
            "(roi_band_fraction: 1.5)",
            "(tick_interval_secs: 0.0)",
            "(tick_interval_secs: 1e20)",
            "(tick_interval_secs: -0.5)",
            "(downsample_target: Some(0))",
            "(aggregation: Uniform(max_range: -1.0))",
        ] {
            assert!(
                matches!(text.parse::<SonifyConfig>(), Err(SonifyError::InvalidConfig(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn huge_intervals_never_panic() {
        let config = SonifyConfig {
            tick_interval_secs: 1e20,
            ..SonifyConfig::default()
        };
        assert!(config.validate().is_err());
        assert_eq!(config.tick_interval(), Duration::from_millis(500));

        assert!(checked_seconds(1e20, "duration").is_err());
        assert!(checked_seconds(f32::NAN, "duration").is_err());
        assert!(checked_seconds(f32::INFINITY, "duration").is_err());
        assert_eq!(checked_seconds(0.0, "duration").unwrap(), Duration::ZERO);
        assert_eq!(
            checked_seconds(2.5, "duration").unwrap(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn malformed_ron_is_a_ron_error() {
        let res = "(zone_count: \"five\")".parse::<SonifyConfig>();
        assert!(matches!(res, Err(SonifyError::RonSpanned(_))));
    }

    #[test]
    fn write_and_read_path() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let config = SonifyConfig {
            zone_count: 3,
            smoothing_window: Some(3),
            orientation: Orientation::Sensor,
            ..SonifyConfig::default()
        };
        config.to_path(tempfile.path()).unwrap();
        assert_eq!(SonifyConfig::from_path(tempfile.path()).unwrap(), config);
    }
}
