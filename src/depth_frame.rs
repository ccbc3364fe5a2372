//! Turns raw half-float depth buffers into [DepthGrid]s.
//!
//! The LiDAR sensor delivers landscape rows. A phone held upright wants
//! portrait, so the decoder can transpose while it reads: logical row `r` of
//! the transposed grid is sensor column `r`. Note that a plain transpose is a
//! rotation *plus* a horizontal mirror, which is why the aggregator flips its
//! output at the very end instead of every consumer guessing.

use crate::error::SonifyError;
use crate::half_float::{self, HALF_MAX};
use crate::TransposableIter;

use log::debug;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Depth assigned to samples that decode to NaN or an infinity. It is the
/// largest finite half, so it lands beyond every range ceiling.
pub const FAR_DEPTH: f32 = HALF_MAX;

/// The pixel formats a capture collaborator may hand us. Only
/// [PixelFormat::DepthFloat16] can be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 16-bit half-float depth in meters
    DepthFloat16,
    /// 32-bit float depth in meters
    DepthFloat32,
    /// 16-bit half-float disparity (1/meters)
    DisparityFloat16,
}

impl PixelFormat {
    /// The short tag used for this format in frame dump headers.
    pub fn tag(&self) -> &'static str {
        match self {
            PixelFormat::DepthFloat16 => "hdep",
            PixelFormat::DepthFloat32 => "fdep",
            PixelFormat::DisparityFloat16 => "hdis",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for PixelFormat {
    type Err = SonifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hdep" => Ok(PixelFormat::DepthFloat16),
            "fdep" => Ok(PixelFormat::DepthFloat32),
            "hdis" => Ok(PixelFormat::DisparityFloat16),
            other => Err(SonifyError::FrameHeader(format!(
                "unknown pixel format {other:?}"
            ))),
        }
    }
}

/// One depth buffer as delivered by the capture side.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthFrame {
    /// `width * height` little-endian samples, row-major
    pub bytes: Vec<u8>,
    /// samples per sensor row
    pub width: usize,
    /// sensor rows
    pub height: usize,
    /// what the samples mean
    pub pixel_format: PixelFormat,
}

impl DepthFrame {
    /// Packs `f32` depths into a half-float frame. Used by the synthetic
    /// sensor and by tests; real frames arrive already encoded.
    pub fn from_depths(width: usize, height: usize, depths: &[f32]) -> Self {
        debug_assert_eq!(depths.len(), width * height);
        let bytes = depths
            .iter()
            .flat_map(|&d| half_float::encode(d).to_le_bytes())
            .collect();

        DepthFrame {
            bytes,
            width,
            height,
            pixel_format: PixelFormat::DepthFloat16,
        }
    }
}

/// Which way round the decoded grid should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Orientation {
    /// Rows and columns exactly as the sensor delivers them.
    Sensor,
    /// Logical row = sensor column, giving a portrait grid.
    #[default]
    Transposed,
}

/// A `height × width` grid of depths in meters. Every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl DepthGrid {
    /// Builds a grid from row-major data, replacing non-finite values with
    /// [FAR_DEPTH]. Panics if `data` does not hold `width * height` values.
    pub fn new(width: usize, height: usize, mut data: Vec<f32>) -> Self {
        assert_eq!(data.len(), width * height, "grid data does not fit");
        for d in data.iter_mut().filter(|d| !d.is_finite()) {
            *d = FAR_DEPTH;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// A grid where every cell holds `depth`.
    pub fn filled(width: usize, height: usize, depth: f32) -> Self {
        Self::new(width, height, vec![depth; width * height])
    }

    /// Builds a grid cell by cell from `f(row, col)`.
    pub fn from_fn(width: usize, height: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let data = (0..height)
            .flat_map(|r| (0..width).map(move |c| (r, c)))
            .map(|(r, c)| f(r, c))
            .collect();
        Self::new(width, height, data)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// True when the grid holds no cells at all.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The depth at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    /// One row of depths.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.width..(row + 1) * self.width]
    }

    /// All values, row-major.
    pub fn values(&self) -> &[f32] {
        &self.data
    }
}

/// Reads [DepthFrame]s into [DepthGrid]s in a fixed [Orientation].
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFrameDecoder {
    orientation: Orientation,
}

impl DepthFrameDecoder {
    /// A decoder producing grids in the given orientation.
    pub fn new(orientation: Orientation) -> Self {
        Self { orientation }
    }

    /// The orientation this decoder produces.
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Decodes a frame. Fails with [SonifyError::InvalidFormat] if the frame
    /// is not half-float depth or its length disagrees with its dimensions.
    pub fn decode(&self, frame: &DepthFrame) -> Result<DepthGrid, SonifyError> {
        if frame.pixel_format != PixelFormat::DepthFloat16 {
            return Err(SonifyError::InvalidFormat(format!(
                "expected {}, got {}",
                PixelFormat::DepthFloat16,
                frame.pixel_format
            )));
        }

        let expected = frame
            .width
            .checked_mul(frame.height)
            .and_then(|n| n.checked_mul(2))
            .ok_or_else(|| SonifyError::InvalidFormat("frame dimensions overflow".to_string()))?;
        if frame.bytes.len() != expected {
            return Err(SonifyError::InvalidFormat(format!(
                "{}x{} frame needs {} bytes, got {}",
                frame.width,
                frame.height,
                expected,
                frame.bytes.len()
            )));
        }

        let samples = frame
            .bytes
            .chunks_exact(2)
            .map(|b| half_float::decode(u16::from_le_bytes([b[0], b[1]])));

        let grid = match self.orientation {
            Orientation::Sensor => DepthGrid::new(frame.width, frame.height, samples.collect()),
            Orientation::Transposed => {
                let sensor_rows: Vec<Vec<f32>> = if frame.width == 0 {
                    Vec::new()
                } else {
                    samples
                        .collect::<Vec<_>>()
                        .chunks(frame.width)
                        .map(<[f32]>::to_vec)
                        .collect()
                };
                // each sensor column becomes one logical row
                let data = sensor_rows.transpose().flatten().collect();
                DepthGrid::new(frame.height, frame.width, data)
            }
        };

        debug!(
            "decoded {}x{} frame into {}x{} grid ({:?})",
            frame.width,
            frame.height,
            grid.width(),
            grid.height(),
            self.orientation
        );
        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counting_frame(width: usize, height: usize) -> DepthFrame {
        let depths: Vec<f32> = (0..width * height).map(|i| i as f32).collect();
        DepthFrame::from_depths(width, height, &depths)
    }

    #[test]
    fn sensor_orientation_keeps_rows() {
        let grid = DepthFrameDecoder::new(Orientation::Sensor)
            .decode(&counting_frame(3, 2))
            .unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.row(0), &[0.0, 1.0, 2.0]);
        assert_eq!(grid.row(1), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn transposed_orientation_swaps_axes() {
        let grid = DepthFrameDecoder::new(Orientation::Transposed)
            .decode(&counting_frame(3, 2))
            .unwrap();
        assert_eq!(grid.width(), 2);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.row(0), &[0.0, 3.0]);
        assert_eq!(grid.row(1), &[1.0, 4.0]);
        assert_eq!(grid.row(2), &[2.0, 5.0]);
    }

    #[test]
    fn wrong_length_is_invalid_format() {
        let mut frame = counting_frame(4, 4);
        frame.bytes.pop();
        let res = DepthFrameDecoder::default().decode(&frame);
        assert!(matches!(res, Err(SonifyError::InvalidFormat(_))));
    }

    #[test]
    fn wrong_pixel_format_is_invalid_format() {
        let mut frame = counting_frame(2, 2);
        frame.pixel_format = PixelFormat::DisparityFloat16;
        let res = DepthFrameDecoder::default().decode(&frame);
        assert!(matches!(res, Err(SonifyError::InvalidFormat(_))));
    }

    #[test]
    fn non_finite_samples_become_far() {
        let mut bytes = Vec::new();
        for bits in [0x7C00u16, 0xFC00, 0x7E00, 0x3C00] {
            bytes.extend_from_slice(&bits.to_le_bytes());
        }
        let frame = DepthFrame {
            bytes,
            width: 2,
            height: 2,
            pixel_format: PixelFormat::DepthFloat16,
        };
        let grid = DepthFrameDecoder::new(Orientation::Sensor)
            .decode(&frame)
            .unwrap();
        assert_eq!(grid.values(), &[FAR_DEPTH, FAR_DEPTH, FAR_DEPTH, 1.0]);
        assert!(grid.values().iter().all(|d| d.is_finite()));
    }

    #[test]
    fn empty_frames_decode_to_empty_grids() {
        for orientation in [Orientation::Sensor, Orientation::Transposed] {
            let decoder = DepthFrameDecoder::new(orientation);
            let grid = decoder.decode(&counting_frame(0, 4)).unwrap();
            assert!(grid.is_empty());
            let grid = decoder.decode(&counting_frame(4, 0)).unwrap();
            assert!(grid.is_empty());
        }
    }

    #[test]
    fn pixel_format_tags_parse_back() {
        for format in [
            PixelFormat::DepthFloat16,
            PixelFormat::DepthFloat32,
            PixelFormat::DisparityFloat16,
        ] {
            assert_eq!(format.tag().parse::<PixelFormat>().unwrap(), format);
        }
        assert!("rgba".parse::<PixelFormat>().is_err());
    }
}
