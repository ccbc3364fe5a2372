//! This module provides an API to read and write [ProximityLog]s, a file
//! format for recording the proximity vectors a session produced, so that a
//! walk can be replayed through the sweep later. The files have the following
//! structure:
//!
//! - First there is a header that contains some metadata:
//!   - The number of zones in every frame
//!   - The frame rate at which vectors were recorded
//!   - The pan position of each zone's channel
//! - Then there is a seperator, which is a byte of all 1s; `0xFF`.
//! - Finally, the samples, which are big-endian `f32`s, one frame after the
//!   other, each frame holding one value per zone.
//!
//! The header is encoded using [serde] and [ron]. In the file, it appears as
//! follows:
//!
//! ```text
//! (n_zones:A,frame_rate:B,pans:[C, D,...])
//! ```

use crate::aggregator::ProximityVector;
use crate::component::Component;
use crate::cue::AudioChannel;
use crate::error::SonifyError;

use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};

/// A recorded sequence of [ProximityVector]s.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityLog {
    header: ProximityLogHeader,
    samples: Vec<f32>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
struct ProximityLogHeader {
    n_zones: u64,
    frame_rate: f32,
    pans: Vec<f32>,
}

impl ProximityLog {
    /// An empty log for vectors of `channels.len()` zones arriving at
    /// `frame_rate` frames per second.
    pub fn new(channels: &[AudioChannel], frame_rate: f32) -> Self {
        Self {
            header: ProximityLogHeader {
                n_zones: channels.len() as u64,
                frame_rate,
                pans: channels.iter().map(|c| c.pan).collect(),
            },
            samples: Vec::new(),
        }
    }

    /// Appends one frame. Vectors of the wrong width are padded with zeros
    /// or truncated so the log stays rectangular.
    pub fn push(&mut self, vector: &ProximityVector) {
        let n = self.header.n_zones as usize;
        self.samples
            .extend((0..n).map(|i| vector.get(i).unwrap_or(0.0)));
    }

    /// Number of zones per frame.
    pub fn zone_count(&self) -> usize {
        self.header.n_zones as usize
    }

    /// Frames per second the log was recorded at.
    pub fn frame_rate(&self) -> f32 {
        self.header.frame_rate
    }

    /// The channel layout recorded with the log.
    pub fn channels(&self) -> Vec<AudioChannel> {
        self.header
            .pans
            .iter()
            .enumerate()
            .map(|(index, &pan)| AudioChannel { index, pan })
            .collect()
    }

    /// Number of recorded frames.
    pub fn len(&self) -> usize {
        match self.zone_count() {
            0 => 0,
            n => self.samples.len() / n,
        }
    }

    /// True when nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The recorded frames, in order.
    pub fn frames(&self) -> Vec<ProximityVector> {
        match self.zone_count() {
            0 => Vec::new(),
            n => self
                .samples
                .chunks(n)
                .map(|c| ProximityVector::new(c.to_vec()))
                .collect(),
        }
    }

    /// Write out a [ProximityLog] to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), SonifyError> {
        let mut handle = File::create(path)?;
        self.to_file(&mut handle)
    }

    /// Write out a [ProximityLog] to the [Write]able object provided.
    pub fn to_file(&self, file: &mut impl Write) -> Result<(), SonifyError> {
        let h_str = ron::ser::to_string(&self.header)?;
        file.write_all(h_str.as_bytes())?;

        file.write_all(&[0xFF])?;

        let s_buf: Vec<u8> = self.samples.iter().flat_map(|f| f.to_be_bytes()).collect();
        file.write_all(&s_buf)?;
        Ok(())
    }

    /// Read a [ProximityLog] from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SonifyError> {
        let mut handle = File::open(path)?;
        Self::from_file(&mut handle)
    }

    /// Read a [ProximityLog] from the [Read]able object provided.
    pub fn from_file(file: &mut impl Read) -> Result<Self, SonifyError> {
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;

        // RON text is UTF-8, which never contains a 0xFF byte
        let delim_idx = raw
            .iter()
            .position(|e| *e == 0xFF)
            .ok_or(SonifyError::NoDelimiter)?;

        let (header_buf, samples_buf) = raw.split_at(delim_idx);
        let samples_buf = &samples_buf[1..];

        let header = ron::de::from_bytes::<ProximityLogHeader>(header_buf)?;
        if header.pans.len() as u64 != header.n_zones {
            return Err(SonifyError::InvalidFormat(format!(
                "{} zones but {} pans",
                header.n_zones,
                header.pans.len()
            )));
        }

        let samples: Vec<f32> = samples_buf
            .chunks(4)
            .map(|bs| {
                let four_bytes: [u8; 4] = bs.try_into().map_err(|_| SonifyError::TryInto)?;
                Ok(f32::from_be_bytes(four_bytes))
            })
            .collect::<Result<Vec<f32>, SonifyError>>()?;

        let n = header.n_zones as usize;
        if (n == 0 && !samples.is_empty()) || (n > 0 && samples.len() % n != 0) {
            return Err(SonifyError::TryInto);
        }

        Ok(ProximityLog { header, samples })
    }
}

/// A pass-through [Component] that records every vector it sees and writes
/// the whole log out when its input closes.
pub struct ProximityRecorder {
    log: ProximityLog,
    path: PathBuf,
}

impl ProximityRecorder {
    /// A recorder that will write to `path` on finalize.
    pub fn new(channels: &[AudioChannel], frame_rate: f32, path: impl Into<PathBuf>) -> Self {
        Self {
            log: ProximityLog::new(channels, frame_rate),
            path: path.into(),
        }
    }
}

impl Component for ProximityRecorder {
    type InData = ProximityVector;
    type OutData = ProximityVector;

    fn convert(&mut self, vector: ProximityVector) -> ProximityVector {
        self.log.push(&vector);
        vector
    }

    fn finalize(&mut self) -> Result<(), SonifyError> {
        info!(
            "{} : writing {} frames to {}",
            self,
            self.log.len(),
            self.path.display()
        );
        self.log.to_path(&self.path)
    }
}

impl fmt::Display for ProximityRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProximityRecorder")
    }
}
