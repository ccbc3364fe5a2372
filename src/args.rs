//! Commandline argument parser using clap for DepthChime

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level arguments
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct SonifyArgs {
    #[command(subcommand, long_about)]
    /// Where the depth comes from: a live (dummy) sensor, a single frame
    /// dump, or a recorded session
    pub command: CommandTask,

    /// RON file to read the configuration from; defaults are used otherwise
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Number of zones, and so of audio channels, overriding the config
    #[arg(short = 'z', long = "zones")]
    pub zones: Option<usize>,

    /// Seconds between cues, overriding the config
    #[arg(short = 'i', long = "interval")]
    pub interval: Option<f32>,
}

/// The three ways to feed the sweep
#[derive(Debug, Subcommand, Clone)]
pub enum CommandTask {
    /// Sweep continuously over frames from the dummy sensor
    #[command(about)]
    Stream(StreamCommand),

    /// Play a single sweep over one captured frame
    #[command(about)]
    Photo(PhotoCommand),

    /// Sweep over a recorded proximity log at its original pace
    #[command(about)]
    Replay(ReplayCommand),
}

/// Options for `stream`
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct StreamCommand {
    /// How long to run, in seconds
    #[arg(short = 'd', long = "duration", default_value_t = 10.0)]
    pub duration: f32,

    /// Frames per second produced by the sensor
    #[arg(short = 'f', long = "fps", default_value_t = 15.0)]
    pub fps: f32,

    /// Sensor width in pixels
    #[arg(long = "width", default_value_t = 256)]
    pub width: usize,

    /// Sensor height in pixels
    #[arg(long = "height", default_value_t = 192)]
    pub height: usize,

    /// Uniform noise added to every sample, in metres
    #[arg(short = 'n', long = "noise", default_value_t = 0.05)]
    pub noise: f32,

    /// Filename to record the proximity vectors to
    #[arg(short = 'r', long = "record")]
    pub record: Option<PathBuf>,

    /// Filename to render the sweep to, instead of logging it
    #[arg(short = 'o', long = "wav")]
    pub wav: Option<PathBuf>,
}

/// Options for `photo`
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct PhotoCommand {
    /// Frame dump to sonify
    pub frame: PathBuf,

    /// Filename to render the sweep to, instead of logging it
    #[arg(short = 'o', long = "wav")]
    pub wav: Option<PathBuf>,
}

/// Options for `replay`
#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct ReplayCommand {
    /// Proximity log to replay
    pub log: PathBuf,

    /// Filename to render the sweep to, instead of logging it
    #[arg(short = 'o', long = "wav")]
    pub wav: Option<PathBuf>,
}
