//! DepthChime turns a live depth sensor feed into a stereo "sweep" of audio
//! cues for low-vision users. The scene in front of the phone is cut into a
//! handful of vertical zones, each zone gets a proximity score between 0
//! (nothing there) and 1 (something very close), and a scheduler plays one
//! panned beep per zone, left to right, at a fixed cadence. Loud beeps mean
//! close obstacles; where the beep sits in the stereo field tells you where.
//!
//! The pipeline, leaf first:
//!
//! - [half_float] decodes the sensor's 16-bit floats.
//! - [depth_frame] turns a raw buffer into a [depth_frame::DepthGrid].
//! - [smoother] optionally box-filters or decimates the grid.
//! - [zones] and [aggregator] reduce the grid to a
//!   [aggregator::ProximityVector].
//! - [proximity_slot] hands the newest vector to the playback side.
//! - [cue_scheduler] and [sweep_player] play it back as [cue::Cue]s.
//!
//! [pipeline] and [component] glue the sensor side onto a worker thread,
//! while [dummy_sensor], [frame_file], [proximity_log] and [wav_sink] feed and
//! record the whole thing without a phone attached.

#![warn(missing_docs)]
pub mod aggregator;
pub mod args;
pub mod component;
pub mod config;
pub mod cue;
pub mod cue_scheduler;
pub mod depth_frame;
pub mod dummy_sensor;
pub mod error;
pub mod frame_file;
pub mod half_float;
pub mod pipeline;
pub mod proximity_log;
pub mod proximity_slot;
pub mod smoother;
pub mod sweep_player;
pub mod wav_sink;
pub mod zones;

/// An iterator function that transposes the order of iteration based on
/// [this StackOverflow answer](https://stackoverflow.com/a/75477884/17443903).
/// Iterating over zero inner iterators yields nothing.
pub struct TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    iterators: Vec<I::IntoIter>,
}

#[allow(missing_docs)]
pub trait TransposableIter<I, T>
where
    Self: Sized,
    Self: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
    fn transpose(self) -> TransposeIter<I, T> {
        let iterators: Vec<_> = self.into_iter().map(|i| i.into_iter()).collect();
        TransposeIter { iterators }
    }
}

impl<I, T> Iterator for TransposeIter<I, T>
where
    I: IntoIterator<Item = T>,
{
    type Item = Vec<T>;
    fn next(&mut self) -> Option<Self::Item> {
        // collecting nothing into an Option would be Some(vec![]) forever
        if self.iterators.is_empty() {
            return None;
        }
        let output: Option<Vec<T>> = self.iterators.iter_mut().map(|iter| iter.next()).collect();
        output
    }
}

impl<I, T, Any> TransposableIter<I, T> for Any
where
    Any: IntoIterator<Item = I>,
    I: IntoIterator<Item = T>,
{
}
