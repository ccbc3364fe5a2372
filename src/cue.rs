//! The output boundary: audio channels, the cues played on them, and the
//! trait any audio backend implements to render those cues.

use crate::error::SonifyError;

use log::info;
use std::fmt;

/// A fixed association between a zone and a stereo pan position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioChannel {
    /// the zone this channel voices
    pub index: usize,
    /// -1.0 is hard left, 1.0 is hard right
    pub pan: f32,
}

impl AudioChannel {
    /// `count` channels with pans spread evenly from hard left to hard right.
    /// Five channels give `-1.0, -0.5, 0.0, 0.5, 1.0`; a single channel sits
    /// in the centre.
    pub fn layout(count: usize) -> Vec<AudioChannel> {
        (0..count)
            .map(|index| AudioChannel {
                index,
                pan: if count > 1 {
                    -1.0 + 2.0 * index as f32 / (count - 1) as f32
                } else {
                    0.0
                },
            })
            .collect()
    }
}

/// One instruction to the audio backend: play the beep on `channel`, placed
/// at `pan`, at `volume`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    /// which channel (and zone) this cue voices
    pub channel: usize,
    /// stereo position in `[-1, 1]`
    pub pan: f32,
    /// playback volume in `[0, 1]`
    pub volume: f32,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel {} pan {:+.2} volume {:.3}",
            self.channel, self.pan, self.volume
        )
    }
}

/// Something that can make a [Cue] audible.
pub trait CueSink {
    /// Renders a single cue. Errors are reported but never stop a sweep.
    fn play(&mut self, cue: &Cue) -> Result<(), SonifyError>;

    /// Flushes and closes the sink once playback is over.
    fn finish(&mut self) -> Result<(), SonifyError> {
        Ok(())
    }
}

/// A [CueSink] that only writes each cue to the log, along with a little
/// volume meter.
#[derive(Debug, Default)]
pub struct LogSink;

impl CueSink for LogSink {
    fn play(&mut self, cue: &Cue) -> Result<(), SonifyError> {
        let bars = (cue.volume * 20.0).round() as usize;
        info!("{cue} |{:<20}|", "#".repeat(bars));
        Ok(())
    }
}

/// A [CueSink] that remembers every cue, for checking what was played.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySink {
    pub(crate) played: std::sync::Arc<std::sync::Mutex<Vec<Cue>>>,
}

#[cfg(test)]
impl MemorySink {
    pub(crate) fn channels(&self) -> Vec<usize> {
        self.played.lock().unwrap().iter().map(|c| c.channel).collect()
    }

    pub(crate) fn cues(&self) -> Vec<Cue> {
        self.played.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl CueSink for MemorySink {
    fn play(&mut self, cue: &Cue) -> Result<(), SonifyError> {
        self.played.lock().unwrap().push(*cue);
        Ok(())
    }
}
