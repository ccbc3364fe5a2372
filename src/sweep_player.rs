//! Drives a [CueScheduler] from a wall-clock timer thread.

use crate::aggregator::ProximityVector;
use crate::cue::{AudioChannel, CueSink};
use crate::cue_scheduler::{CueScheduler, SchedulerState};
use crate::error::SonifyError;
use crate::proximity_slot::ProximitySlot;

use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

enum Signal {
    Stop,
}

struct Timer {
    handle: thread::JoinHandle<()>,
    tx: mpsc::Sender<Signal>,
}

/// Owns a [CueScheduler] and the one timer thread allowed to tick it.
///
/// Every tick runs under the scheduler's lock, and stopping joins the timer
/// thread before touching the scheduler. So once [SweepPlayer::stop] returns
/// no tick is in flight, and [SweepPlayer::start] can never leave two timers
/// ticking the same channels.
pub struct SweepPlayer<S>
where
    S: CueSink + Send + 'static,
{
    scheduler: Arc<Mutex<CueScheduler<S>>>,
    slot: ProximitySlot,
    timer: Option<Timer>,
}

impl<S> SweepPlayer<S>
where
    S: CueSink + Send + 'static,
{
    /// A stopped player voicing `channels` through `sink`.
    pub fn new(channels: Vec<AudioChannel>, sink: S) -> Self {
        let scheduler = CueScheduler::new(channels, sink);
        let slot = scheduler.slot();
        Self {
            scheduler: Arc::new(Mutex::new(scheduler)),
            slot,
            timer: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CueScheduler<S>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A handle the sensor side can publish fresh vectors into.
    pub fn slot(&self) -> ProximitySlot {
        self.slot.clone()
    }

    /// Idle or Running. A finished one-shot sweep reads as Idle.
    pub fn state(&self) -> SchedulerState {
        self.lock().state()
    }

    /// Starts a streaming sweep, cancelling whatever was playing first.
    pub fn start(&mut self, interval: Duration, initial: ProximityVector) {
        self.stop();
        self.lock().start(interval, initial);
        self.arm(interval);
    }

    /// Starts a single self-terminating pass over `snapshot`, cancelling
    /// whatever was playing first.
    pub fn play_once(&mut self, interval: Duration, snapshot: ProximityVector) {
        self.stop();
        self.lock().start_one_shot(interval, snapshot);
        self.arm(interval);
    }

    /// Publishes a new vector for the next streaming tick.
    pub fn update(&self, vector: ProximityVector) {
        self.slot.publish(vector);
    }

    fn arm(&mut self, interval: Duration) {
        let (tx, rx) = mpsc::channel::<Signal>();
        let scheduler = Arc::clone(&self.scheduler);

        let handle = thread::spawn(move || {
            let mut deadline = Instant::now() + interval;
            loop {
                let wait = deadline.saturating_duration_since(Instant::now());
                match rx.recv_timeout(wait) {
                    Err(RecvTimeoutError::Timeout) => {
                        let mut sched = scheduler.lock().unwrap_or_else(PoisonError::into_inner);
                        sched.tick();
                        if sched.state() == SchedulerState::Idle {
                            debug!("timer: sweep finished on its own");
                            break;
                        }
                    }
                    Ok(Signal::Stop) | Err(RecvTimeoutError::Disconnected) => break,
                }
                deadline += interval;
                // a slow tick skips the beats it overran rather than replaying them
                let now = Instant::now();
                if deadline <= now {
                    debug!("timer: tick overran, skipping missed beats");
                    deadline = now + interval;
                }
            }
        });

        self.timer = Some(Timer { handle, tx });
    }

    /// Cancels the timer, waits for it to exit, and idles the scheduler.
    /// Safe to call in any state.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            // the thread may already be gone after a one-shot, that's fine
            let _ = timer.tx.send(Signal::Stop);
            if timer.handle.join().is_err() {
                warn!("sweep timer thread panicked");
            }
        }
        self.lock().stop();
    }

    /// Blocks until a one-shot sweep has played all of its cues. Returns
    /// immediately if nothing is playing. A streaming sweep never ends on its
    /// own, so only call this after [SweepPlayer::play_once].
    pub fn wait(&mut self) {
        if let Some(timer) = self.timer.take() {
            if timer.handle.join().is_err() {
                warn!("sweep timer thread panicked");
            }
        }
    }

    /// Stops playback and finishes the sink.
    pub fn finish(mut self) -> Result<(), SonifyError> {
        self.stop();
        // bound first so the guard is released before `self` is dropped
        let result = self.lock().sink_mut().finish();
        result
    }
}

impl<S> Drop for SweepPlayer<S>
where
    S: CueSink + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
