//! A [CueSink] that renders the sweep into a stereo WAV file with hound,
//! for listening back to a session without an audio device.

use crate::cue::{Cue, CueSink};
use crate::error::SonifyError;

use hound::{SampleFormat, WavSpec, WavWriter};
use std::f32::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

/// Output sample rate
pub const SAMPLE_RATE: u32 = 44100;
/// Pitch of the cue tone, in Hz
pub const BEEP_FREQUENCY: f32 = 333.0;
/// Longest a beep sounds; the rest of each cue is silence
pub const BEEP_SECS: f32 = 0.12;

// samples faded in and out at each end of a beep
const FADE_SAMPLES: usize = 64;

/// Left and right gains for a pan in `[-1, 1]`, keeping the total power
/// constant across the field.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * PI / 4.0;
    (angle.cos(), angle.sin())
}

/// Writes one beep per cue, each followed by silence so that every cue takes
/// exactly one tick of the sweep.
pub struct WavSink {
    writer: Option<WavWriter<BufWriter<File>>>,
    cue_samples: usize,
    beep_samples: usize,
}

impl WavSink {
    /// Creates `path`, with each cue lasting `cue_length`.
    pub fn create(path: impl AsRef<Path>, cue_length: Duration) -> Result<Self, SonifyError> {
        let spec = WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let writer = WavWriter::create(path, spec)?;

        let cue_samples = (cue_length.as_secs_f32() * SAMPLE_RATE as f32).round() as usize;
        let beep_samples = cue_samples.min((BEEP_SECS * SAMPLE_RATE as f32) as usize);
        Ok(Self {
            writer: Some(writer),
            cue_samples,
            beep_samples,
        })
    }

    fn envelope(&self, i: usize) -> f32 {
        let fade = FADE_SAMPLES.min(self.beep_samples / 2).max(1) as f32;
        let from_start = i as f32 / fade;
        let from_end = (self.beep_samples - i) as f32 / fade;
        from_start.min(from_end).min(1.0)
    }
}

impl CueSink for WavSink {
    fn play(&mut self, cue: &Cue) -> Result<(), SonifyError> {
        let (left, right) = pan_gains(cue.pan);
        let step = 2.0 * PI * BEEP_FREQUENCY / SAMPLE_RATE as f32;

        let samples: Vec<f32> = (0..self.cue_samples)
            .map(|i| {
                if i < self.beep_samples {
                    cue.volume * self.envelope(i) * (i as f32 * step).sin()
                } else {
                    0.0
                }
            })
            .collect();

        let writer = self
            .writer
            .as_mut()
            .ok_or(hound::Error::FormatError("wav sink already finished"))?;

        // interleave the two channels
        for s in samples {
            writer.write_sample(s * left)?;
            writer.write_sample(s * right)?;
        }

        // flush after each cue so the header always reflects what was written
        writer.flush()?;
        Ok(())
    }

    /// Finalizes the file. Dropping the writer would do this too, but this
    /// way the error is reported.
    fn finish(&mut self) -> Result<(), SonifyError> {
        match self.writer.take() {
            Some(writer) => Ok(writer.finalize()?),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hound::WavReader;

    fn split(path: &Path) -> (Vec<f32>, Vec<f32>) {
        let mut reader = WavReader::open(path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_format, SampleFormat::Float);
        let all_samps = reader
            .samples::<f32>()
            .collect::<Result<Vec<f32>, hound::Error>>()
            .unwrap();
        let left = all_samps.iter().step_by(2).copied().collect();
        let right = all_samps.iter().skip(1).step_by(2).copied().collect();
        (left, right)
    }

    fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0, |m, s| m.max(s.abs()))
    }

    #[test]
    fn pan_law() {
        assert_eq!(pan_gains(-1.0), (1.0, 0.0));
        let (l, r) = pan_gains(1.0);
        assert!(l.abs() < 1e-6 && (r - 1.0).abs() < 1e-6);
        let (l, r) = pan_gains(0.0);
        assert!((l - r).abs() < 1e-6);
        assert!((l * l + r * r - 1.0).abs() < 1e-6);
    }

    #[test]
    fn each_cue_takes_one_tick() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.wav");
        let mut sink = WavSink::create(&path, Duration::from_millis(200)).unwrap();

        sink.play(&Cue { channel: 0, pan: -1.0, volume: 1.0 }).unwrap();
        sink.play(&Cue { channel: 4, pan: 1.0, volume: 0.5 }).unwrap();
        sink.play(&Cue { channel: 2, pan: 0.0, volume: 0.0 }).unwrap();
        sink.finish().unwrap();

        let (left, right) = split(&path);
        let cue = (0.2 * SAMPLE_RATE as f32).round() as usize;
        assert_eq!(left.len(), 3 * cue);

        // hard left cue, then hard right at half volume, then silence
        assert!(peak(&left[..cue]) > 0.9);
        assert_eq!(peak(&right[..cue]), 0.0);
        assert!(peak(&left[cue..2 * cue]) < 1e-6);
        let half = peak(&right[cue..2 * cue]);
        assert!(half > 0.4 && half <= 0.5, "{half}");
        assert_eq!(peak(&left[2 * cue..]), 0.0);
        assert_eq!(peak(&right[2 * cue..]), 0.0);
    }

    #[test]
    fn beep_is_followed_by_silence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beep.wav");
        let mut sink = WavSink::create(&path, Duration::from_millis(500)).unwrap();
        sink.play(&Cue { channel: 0, pan: 0.0, volume: 1.0 }).unwrap();
        sink.finish().unwrap();

        let (left, _) = split(&path);
        let beep = (BEEP_SECS * SAMPLE_RATE as f32) as usize;
        assert!(peak(&left[..beep]) > 0.5);
        assert_eq!(peak(&left[beep..]), 0.0);
    }

    #[test]
    fn finishing_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = WavSink::create(dir.path().join("x.wav"), Duration::from_millis(10)).unwrap();
        assert!(sink.finish().is_ok());
        assert!(sink.finish().is_ok());
        assert!(matches!(
            sink.play(&Cue { channel: 0, pan: 0.0, volume: 1.0 }),
            Err(SonifyError::Wav(_))
        ));
    }
}
