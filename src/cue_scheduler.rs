//! The round-robin cue player, as a plain state machine.
//!
//! Nothing in here knows about clocks. Each call to [CueScheduler::tick] is
//! one beat of the sweep, which keeps the ordering logic testable without
//! sleeping; [crate::sweep_player] is what calls `tick` on a real timer.

use crate::aggregator::ProximityVector;
use crate::cue::{AudioChannel, Cue, CueSink};
use crate::proximity_slot::ProximitySlot;

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

/// Whether the scheduler is producing cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// No sweep in progress; ticks do nothing.
    Idle,
    /// A sweep is in progress.
    Running,
}

#[derive(Debug, Clone)]
enum Mode {
    /// Sweep forever, reading whatever vector is newest on every tick.
    Streaming,
    /// Sweep once across every channel using a vector frozen at start.
    OneShot(Arc<ProximityVector>),
}

/// Plays one zone per tick, cycling through the channels in order.
pub struct CueScheduler<S: CueSink> {
    channels: Vec<AudioChannel>,
    latest: ProximitySlot,
    sink: S,
    tick_index: usize,
    interval: Duration,
    mode: Option<Mode>,
}

impl<S: CueSink> CueScheduler<S> {
    /// A scheduler voicing `channels` through `sink`. The scheduler starts
    /// [SchedulerState::Idle] with a silent latest vector.
    pub fn new(channels: Vec<AudioChannel>, sink: S) -> Self {
        let latest = ProximitySlot::new(ProximityVector::silent(channels.len()));
        Self {
            channels,
            latest,
            sink,
            tick_index: 0,
            interval: Duration::ZERO,
            mode: None,
        }
    }

    /// The slot streaming ticks read from. Hand a clone to the producer so
    /// it can publish without going through the scheduler at all.
    pub fn slot(&self) -> ProximitySlot {
        self.latest.clone()
    }

    /// The channels being voiced.
    pub fn channels(&self) -> &[AudioChannel] {
        &self.channels
    }

    /// Idle or Running.
    pub fn state(&self) -> SchedulerState {
        match self.mode {
            Some(_) => SchedulerState::Running,
            None => SchedulerState::Idle,
        }
    }

    /// The cadence the current sweep was started with.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How many cues the current sweep has played.
    pub fn tick_index(&self) -> usize {
        self.tick_index
    }

    /// Starts a never-ending sweep, publishing `initial` as the latest
    /// vector. Any sweep already in progress is replaced.
    pub fn start(&mut self, interval: Duration, initial: ProximityVector) {
        self.latest.publish(initial);
        self.begin(interval, Mode::Streaming);
    }

    /// Starts a single pass over every channel using `snapshot`, after which
    /// the scheduler goes back to idle on its own. Later calls to
    /// [CueScheduler::update] do not affect this pass.
    pub fn start_one_shot(&mut self, interval: Duration, snapshot: ProximityVector) {
        self.begin(interval, Mode::OneShot(Arc::new(snapshot)));
    }

    fn begin(&mut self, interval: Duration, mode: Mode) {
        info!(
            "starting {} sweep over {} channels every {:?}",
            match mode {
                Mode::Streaming => "streaming",
                Mode::OneShot(_) => "one-shot",
            },
            self.channels.len(),
            interval
        );
        self.tick_index = 0;
        self.interval = interval;
        self.mode = Some(mode);
    }

    /// Replaces the vector the next streaming tick will read. Never plays
    /// anything itself.
    pub fn update(&self, vector: ProximityVector) {
        self.latest.publish(vector);
    }

    /// Goes back to idle. Safe to call in any state.
    pub fn stop(&mut self) {
        if self.mode.take().is_some() {
            info!("sweep stopped after {} cues", self.tick_index);
        }
    }

    /// Plays the next cue, if running. Returns the cue that was played.
    pub fn tick(&mut self) -> Option<Cue> {
        let vector = match self.mode.as_ref()? {
            Mode::Streaming => self.latest.load(),
            Mode::OneShot(snapshot) => Arc::clone(snapshot),
        };

        if self.channels.is_empty() {
            self.stop();
            return None;
        }

        let channel = self.tick_index % self.channels.len();
        let volume = match vector.get(channel) {
            Some(v) if !v.is_nan() => v.clamp(0.0, 1.0),
            _ => 0.0,
        };
        let cue = Cue {
            channel,
            pan: self.channels[channel].pan,
            volume,
        };

        debug!("tick {}: {}", self.tick_index, cue);
        if let Err(error) = self.sink.play(&cue) {
            warn!("could not play {} : {}", cue, error);
        }
        self.tick_index += 1;

        if matches!(self.mode, Some(Mode::OneShot(_))) && self.tick_index >= self.channels.len() {
            self.stop();
        }
        Some(cue)
    }

    /// The sink cues are played through.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Stops and gives back the sink, e.g. to finish writing a file.
    pub fn into_sink(mut self) -> S {
        self.stop();
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cue::MemorySink;

    const INTERVAL: Duration = Duration::from_millis(100);

    fn scheduler(zones: usize) -> (CueScheduler<MemorySink>, MemorySink) {
        let sink = MemorySink::default();
        (
            CueScheduler::new(AudioChannel::layout(zones), sink.clone()),
            sink,
        )
    }

    #[test]
    fn idle_ticks_play_nothing() {
        let (mut sched, sink) = scheduler(5);
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(sched.tick(), None);
        assert!(sink.cues().is_empty());
    }

    #[test]
    fn ten_ticks_visit_channels_in_order() {
        let (mut sched, sink) = scheduler(5);
        sched.start(INTERVAL, ProximityVector::new(vec![0.2; 5]));
        assert_eq!(sched.interval(), INTERVAL);
        for _ in 0..10 {
            assert!(sched.tick().is_some());
        }
        assert_eq!(sink.channels(), vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 4]);
        assert_eq!(sched.state(), SchedulerState::Running);
    }

    #[test]
    fn cues_carry_pan_and_volume() {
        let (mut sched, sink) = scheduler(5);
        sched.start(INTERVAL, ProximityVector::new(vec![0.1, 0.2, 0.3, 0.4, 0.5]));
        for _ in 0..5 {
            sched.tick();
        }
        let cues = sink.cues();
        let pans: Vec<f32> = cues.iter().map(|c| c.pan).collect();
        let volumes: Vec<f32> = cues.iter().map(|c| c.volume).collect();
        assert_eq!(pans, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(volumes, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
    }

    #[test]
    fn streaming_ticks_read_the_newest_vector() {
        let (mut sched, _sink) = scheduler(2);
        sched.start(INTERVAL, ProximityVector::new(vec![0.1, 0.1]));
        assert_eq!(sched.tick().unwrap().volume, 0.1);

        sched.update(ProximityVector::new(vec![0.9, 0.8]));
        assert_eq!(sched.tick().unwrap().volume, 0.8);

        // publishing through a detached slot handle works the same way
        sched.slot().publish(ProximityVector::new(vec![0.4, 0.4]));
        assert_eq!(sched.tick().unwrap().volume, 0.4);
    }

    #[test]
    fn update_never_plays() {
        let (mut sched, sink) = scheduler(3);
        sched.start(INTERVAL, ProximityVector::silent(3));
        sched.update(ProximityVector::new(vec![1.0; 3]));
        assert!(sink.cues().is_empty());
    }

    #[test]
    fn short_vectors_play_silence() {
        let (mut sched, _sink) = scheduler(3);
        sched.start(INTERVAL, ProximityVector::new(vec![0.7]));
        assert_eq!(sched.tick().unwrap().volume, 0.7);
        assert_eq!(sched.tick().unwrap().volume, 0.0);
    }

    #[test]
    fn restart_resets_the_tick_index() {
        let (mut sched, sink) = scheduler(5);
        sched.start(INTERVAL, ProximityVector::silent(5));
        sched.tick();
        sched.tick();
        sched.stop();
        sched.start(INTERVAL, ProximityVector::silent(5));
        sched.tick();
        assert_eq!(sink.channels(), vec![0, 1, 0]);
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut sched, _sink) = scheduler(5);
        sched.stop();
        sched.start(INTERVAL, ProximityVector::silent(5));
        sched.stop();
        sched.stop();
        assert_eq!(sched.state(), SchedulerState::Idle);
        assert_eq!(sched.tick(), None);
    }

    #[test]
    fn one_shot_plays_each_channel_once_from_its_snapshot() {
        let (mut sched, sink) = scheduler(5);
        sched.start_one_shot(INTERVAL, ProximityVector::new(vec![0.5; 5]));
        sched.update(ProximityVector::new(vec![1.0; 5]));

        while sched.tick().is_some() {}

        assert_eq!(sink.channels(), vec![0, 1, 2, 3, 4]);
        assert!(sink.cues().iter().all(|c| c.volume == 0.5));
        assert_eq!(sched.state(), SchedulerState::Idle);
    }

    #[test]
    fn no_channels_means_no_cues() {
        let (mut sched, sink) = scheduler(0);
        sched.start(INTERVAL, ProximityVector::silent(0));
        assert_eq!(sched.tick(), None);
        assert!(sink.cues().is_empty());
    }
}
