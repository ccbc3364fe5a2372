//! A stand-in for a real depth camera. It renders a far wall with one near
//! obstacle drifting from the listener's left to their right, and sends the
//! frames down a channel at a fixed rate, landscape and half-float encoded
//! exactly like the real sensor. Like a real sensor it never waits for its
//! consumer: a frame that finds the channel full is dropped.

use crate::depth_frame::{DepthFrame, FAR_DEPTH};

use log::{debug, warn};
use rand::prelude::*;
use std::sync::mpsc::{self, TrySendError};
use std::thread;
use std::time::Duration;

/// Metres to the back wall of the dummy scene
pub const WALL_DEPTH: f32 = 3.5;
/// Metres to the obstacle
pub const OBSTACLE_DEPTH: f32 = 0.8;
/// Half the obstacle's width, as a fraction of the field of view
pub const OBSTACLE_HALF_WIDTH: f32 = 0.1;
/// Frames the obstacle takes to cross the field of view
pub const CROSSING_FRAMES: usize = 60;

enum Signal {
    Noise(f32),
    Obstacle(Option<f32>),
    Stop,
}

/// A thread producing synthetic [DepthFrame]s until stopped, or until the
/// receiving end of its channel is dropped.
pub struct DummySensor {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
}

impl DummySensor {
    /// Starts producing `width` x `height` frames, `fps` times a second.
    /// The channel's bound is the most frames that can wait for the
    /// consumer; anything beyond that is dropped.
    pub fn new(
        width: usize,
        height: usize,
        fps: f32,
        frames: mpsc::SyncSender<DepthFrame>,
    ) -> Self {
        let (tx, rx) = mpsc::channel::<Signal>();
        let period = Duration::from_secs_f32(1.0 / fps.max(0.1));

        let handle = thread::spawn(move || {
            let mut rng = thread_rng();
            let mut noise = 0.0;
            let mut pinned: Option<f32> = None;
            let mut step = 0;
            let mut dropped = 0usize;
            let mut running = true;
            while running {
                while let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::Noise(new_noise) => noise = new_noise,
                        Signal::Obstacle(position) => pinned = position,
                        Signal::Stop => running = false,
                    }
                }
                if !running {
                    break;
                }

                let obstacle_x = pinned.unwrap_or_else(|| crossing_position(step));
                let frame = render_scene(width, height, obstacle_x, noise, &mut rng);
                match frames.try_send(frame) {
                    Ok(()) => {}
                    Err(TrySendError::Full(_)) => {
                        dropped += 1;
                        debug!("dummy sensor: consumer busy, dropped frame {step}");
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        debug!("dummy sensor: receiver hung up");
                        break;
                    }
                }
                step += 1;
                spin_sleep::sleep(period);
            }
            if dropped > 0 {
                debug!("dummy sensor: dropped {dropped} frames in total");
            }
        });

        DummySensor {
            handle: Some(handle),
            tx,
        }
    }

    /// Adds uniform noise of up to `noise` metres to every sample. A
    /// non-finite amount is ignored.
    pub fn set_noise(&self, noise: f32) {
        if !noise.is_finite() {
            warn!("dummy sensor: ignoring noise of {noise} metres");
            return;
        }
        self.signal(Signal::Noise(noise.abs()));
    }

    /// Holds the obstacle at `position` (0 is the listener's far left, 1 the
    /// far right), or lets it drift again with `None`.
    pub fn pin_obstacle(&self, position: Option<f32>) {
        self.signal(Signal::Obstacle(position));
    }

    fn signal(&self, signal: Signal) {
        if self.tx.send(signal).is_err() {
            warn!("dummy sensor: thread already exited");
        }
    }

    /// Stops the thread and waits for it. Safe to call more than once.
    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        if let Some(thread) = self.handle.take() {
            if thread.join().is_err() {
                warn!("dummy sensor: thread panicked");
            }
        }
    }
}

impl Drop for DummySensor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn crossing_position(step: usize) -> f32 {
    (step % CROSSING_FRAMES) as f32 / (CROSSING_FRAMES - 1) as f32
}

/// Renders one landscape frame. The sensor is rotated a quarter turn from
/// the listener: sensor rows run across the scene, and the highest row is
/// the listener's left.
fn render_scene(
    width: usize,
    height: usize,
    obstacle_x: f32,
    noise: f32,
    rng: &mut impl Rng,
) -> DepthFrame {
    // wider than any half can hold is no noisier, and keeps the range finite
    let noise = if noise.is_finite() {
        noise.abs().min(FAR_DEPTH)
    } else {
        0.0
    };
    let mut depths = Vec::with_capacity(width * height);
    for row in 0..height {
        let scene_x = 1.0 - (row as f32 + 0.5) / height as f32;
        let base = if (scene_x - obstacle_x).abs() <= OBSTACLE_HALF_WIDTH {
            OBSTACLE_DEPTH
        } else {
            WALL_DEPTH
        };
        for _ in 0..width {
            let jitter = if noise > 0.0 {
                rng.gen_range(-noise..noise)
            } else {
                0.0
            };
            depths.push((base + jitter).max(0.0));
        }
    }
    DepthFrame::from_depths(width, height, &depths)
}
