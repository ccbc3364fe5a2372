//! The sensor-delivery path: depth frame in, proximity vector out.

use crate::aggregator::{ProximityVector, ZoneAggregator};
use crate::component::Component;
use crate::config::SonifyConfig;
use crate::depth_frame::{DepthFrame, DepthFrameDecoder};
use crate::error::SonifyError;
use crate::smoother::{downsample, smooth};

use log::{debug, warn};
use std::fmt;

/// Decodes, optionally smooths, and aggregates depth frames.
///
/// As a [Component] it never fails: a frame that cannot be decoded is
/// dropped and the previous vector goes out again, so the sweep keeps its
/// last picture of the scene instead of falling silent or stopping.
#[derive(Debug, Clone)]
pub struct DepthPipeline {
    decoder: DepthFrameDecoder,
    smoothing_window: Option<usize>,
    downsample_target: Option<usize>,
    aggregator: ZoneAggregator,
    last: ProximityVector,
    dropped: usize,
}

impl DepthPipeline {
    /// Builds the pipeline a config describes.
    pub fn new(config: &SonifyConfig) -> Self {
        let aggregator = config.aggregator();
        Self {
            decoder: DepthFrameDecoder::new(config.orientation),
            smoothing_window: config.smoothing_window,
            downsample_target: config.downsample_target,
            last: ProximityVector::silent(aggregator.zone_count()),
            aggregator,
            dropped: 0,
        }
    }

    /// Runs one frame through decode, smoothing, decimation and aggregation.
    pub fn process(&self, frame: &DepthFrame) -> Result<ProximityVector, SonifyError> {
        let grid = self.decoder.decode(frame)?;
        let grid = match self.smoothing_window {
            Some(window) if window > 1 => smooth(&grid, window),
            _ => grid,
        };
        let grid = match self.downsample_target {
            Some(target) => downsample(&grid, target),
            None => grid,
        };
        let vector = self.aggregator.aggregate(&grid);
        debug!("frame -> {:?}", vector.as_slice());
        Ok(vector)
    }

    /// The most recent vector successfully produced, silent before the first.
    pub fn last(&self) -> &ProximityVector {
        &self.last
    }

    /// How many frames have been dropped so far.
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

impl Component for DepthPipeline {
    type InData = DepthFrame;
    type OutData = ProximityVector;

    fn convert(&mut self, frame: DepthFrame) -> ProximityVector {
        match self.process(&frame) {
            Ok(vector) => {
                self.last = vector.clone();
                vector
            }
            Err(error) => {
                self.dropped += 1;
                warn!("{} : dropping frame : {}", self, error);
                self.last.clone()
            }
        }
    }

    fn finalize(&mut self) -> Result<(), SonifyError> {
        if self.dropped > 0 {
            warn!("{} : dropped {} frames in total", self, self.dropped);
        }
        Ok(())
    }
}

impl fmt::Display for DepthPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepthPipeline")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::AggregationPolicy;
    use crate::component::run_component;
    use crate::depth_frame::{Orientation, PixelFormat};
    use std::sync::mpsc::channel;

    fn wall(width: usize, height: usize, depth: f32) -> DepthFrame {
        DepthFrame::from_depths(width, height, &vec![depth; width * height])
    }

    #[test]
    fn two_meter_wall_end_to_end() {
        let pipeline = DepthPipeline::new(&SonifyConfig::default());
        let vector = pipeline.process(&wall(100, 100, 2.0)).unwrap();
        assert_eq!(vector.len(), 5);
        assert!(vector.as_slice().iter().all(|v| (v - 0.5).abs() < 1e-3));
    }

    #[test]
    fn zero_depth_wall_end_to_end() {
        let pipeline = DepthPipeline::new(&SonifyConfig::default());
        let vector = pipeline.process(&wall(100, 100, 0.0)).unwrap();
        assert!(vector.as_slice().iter().all(|v| *v < 0.01));
    }

    /// The sensor is landscape and the phone is portrait: sensor row `r`
    /// becomes grid column `r`, and the bottom sensor rows are the scene's
    /// left. An obstacle there must come out at index 0.
    #[test]
    fn left_obstacle_reports_at_index_zero() {
        let (width, height) = (12, 10);
        let depths: Vec<f32> = (0..height)
            .flat_map(|r| (0..width).map(move |_| if r >= height / 2 { 0.5 } else { 3.5 }))
            .collect();
        let frame = DepthFrame::from_depths(width, height, &depths);

        let pipeline = DepthPipeline::new(&SonifyConfig::default());
        let vector = pipeline.process(&frame).unwrap();
        let v = vector.as_slice();
        assert!(v[0] > v[4], "{v:?}");
        assert!(v[1] > v[3], "{v:?}");
    }

    #[test]
    fn smoothing_is_applied_before_aggregation() {
        // a single near column gets spread into its neighbours
        let config = SonifyConfig {
            orientation: Orientation::Sensor,
            mirror_correction: false,
            zone_count: 10,
            smoothing_window: Some(3),
            roi_band_fraction: 1.0,
            ..SonifyConfig::default()
        };
        let depths: Vec<f32> = (0..10 * 4)
            .map(|i| if i % 10 == 4 { 0.4 } else { 3.6 })
            .collect();
        let frame = DepthFrame::from_depths(10, 4, &depths);

        let raw = DepthPipeline::new(&SonifyConfig {
            smoothing_window: None,
            ..config.clone()
        })
        .process(&frame)
        .unwrap();
        let smoothed = DepthPipeline::new(&config).process(&frame).unwrap();

        assert!(smoothed.as_slice()[3] > raw.as_slice()[3]);
        assert!(smoothed.as_slice()[4] < raw.as_slice()[4]);
    }

    #[test]
    fn downsampling_keeps_the_picture() {
        let full = DepthPipeline::new(&SonifyConfig::default());
        let coarse = DepthPipeline::new(&SonifyConfig {
            downsample_target: Some(20),
            ..SonifyConfig::default()
        });
        let frame = wall(160, 120, 2.0);
        assert_eq!(full.process(&frame).unwrap(), coarse.process(&frame).unwrap());
    }

    #[test]
    fn dropped_frames_reuse_the_previous_vector() {
        let mut pipeline = DepthPipeline::new(&SonifyConfig {
            aggregation: AggregationPolicy::Weighted { cap: 5.0 },
            ..SonifyConfig::default()
        });

        let good = pipeline.convert(wall(20, 20, 1.0));
        let mut bad = wall(20, 20, 1.0);
        bad.pixel_format = PixelFormat::DepthFloat32;
        let reused = pipeline.convert(bad);

        assert_eq!(good, reused);
        assert_eq!(pipeline.dropped(), 1);
        assert!(pipeline.finalize().is_ok());
    }

    #[test]
    fn bad_first_frame_is_silent() {
        let mut pipeline = DepthPipeline::new(&SonifyConfig::default());
        let mut bad = wall(4, 4, 1.0);
        bad.bytes.truncate(3);
        assert_eq!(pipeline.convert(bad), ProximityVector::silent(5));
    }

    #[test]
    fn runs_as_a_component() {
        let (frame_tx, frame_rx) = channel();
        let (vector_tx, vector_rx) = channel();
        let pipeline = DepthPipeline::new(&SonifyConfig::default());
        let handle = run_component(Box::new(pipeline), frame_rx, vector_tx);

        frame_tx.send(wall(50, 40, 2.0)).unwrap();
        frame_tx.send(wall(50, 40, 1.0)).unwrap();
        let first = vector_rx.recv().unwrap();
        let second = vector_rx.recv().unwrap();
        assert!(second.as_slice()[0] > first.as_slice()[0]);

        drop(frame_tx);
        handle.join().unwrap();
    }
}
