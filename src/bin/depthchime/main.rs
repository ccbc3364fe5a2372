//! Command line front end: sweeps over a dummy sensor stream, a single
//! captured frame, or a recorded proximity log.

use clap::Parser;
use depthchime::{
    aggregator::ProximityVector,
    args::{CommandTask, PhotoCommand, ReplayCommand, SonifyArgs, StreamCommand},
    component::run_component,
    config::{checked_seconds, SonifyConfig},
    cue::{AudioChannel, CueSink, LogSink},
    dummy_sensor::DummySensor,
    error::SonifyError,
    frame_file::read_frame_path,
    pipeline::DepthPipeline,
    proximity_log::{ProximityLog, ProximityRecorder},
    sweep_player::SweepPlayer,
    wav_sink::WavSink,
};

use log::{error, info, warn};
use std::{
    process::ExitCode,
    sync::mpsc::{self, RecvTimeoutError},
    thread::JoinHandle,
    time::{Duration, Instant},
};

// Example:
// cargo run --bin depthchime --
//                            --zones     5
//                            --interval  0.25 stream
//                            --duration  20
//                            --record    walk.plog
//                            --wav       walk.wav

fn main() -> ExitCode {
    env_logger::init();
    let args = SonifyArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("depthchime: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: SonifyArgs) -> Result<(), SonifyError> {
    let config = load_config(&args)?;
    info!("running with {:?}", config);

    match args.command {
        CommandTask::Stream(cmd) => match &cmd.wav {
            Some(path) => stream(&config, &cmd, WavSink::create(path, config.tick_interval())?),
            None => stream(&config, &cmd, LogSink),
        },
        CommandTask::Photo(cmd) => match &cmd.wav {
            Some(path) => photo(&config, &cmd, WavSink::create(path, config.tick_interval())?),
            None => photo(&config, &cmd, LogSink),
        },
        CommandTask::Replay(cmd) => match &cmd.wav {
            Some(path) => replay(&config, &cmd, WavSink::create(path, config.tick_interval())?),
            None => replay(&config, &cmd, LogSink),
        },
    }
}

/// The config file if one was given, with any commandline overrides applied.
fn load_config(args: &SonifyArgs) -> Result<SonifyConfig, SonifyError> {
    let mut config = match &args.config {
        Some(path) => SonifyConfig::from_path(path)?,
        None => SonifyConfig::default(),
    };
    if let Some(zones) = args.zones {
        config.zone_count = zones;
    }
    if let Some(interval) = args.interval {
        config.tick_interval_secs = interval;
    }
    config.validate()?;
    Ok(config)
}

fn join(handle: JoinHandle<()>, name: &str) {
    if handle.join().is_err() {
        warn!("{name} thread panicked");
    }
}

fn stream<S>(config: &SonifyConfig, cmd: &StreamCommand, sink: S) -> Result<(), SonifyError>
where
    S: CueSink + Send + 'static,
{
    let duration = checked_seconds(cmd.duration, "duration")?;
    if !cmd.noise.is_finite() {
        return Err(SonifyError::InvalidConfig(format!(
            "noise must be a finite number of metres, got {}",
            cmd.noise
        )));
    }
    if !(cmd.fps > 0.0) || !cmd.fps.is_finite() {
        return Err(SonifyError::InvalidConfig(format!(
            "fps must be positive, got {}",
            cmd.fps
        )));
    }

    let channels = AudioChannel::layout(config.zone_count);
    let mut player = SweepPlayer::new(channels.clone(), sink);
    player.start(
        config.tick_interval(),
        ProximityVector::silent(config.zone_count),
    );

    // room for one frame: when aggregation falls behind, the sensor drops
    // frames instead of queueing stale ones
    let (frame_tx, frame_rx) = mpsc::sync_channel(1);
    let (vector_tx, vector_rx) = mpsc::channel();
    let pipeline = run_component(Box::new(DepthPipeline::new(config)), frame_rx, vector_tx);

    let (vector_rx, recorder) = match &cmd.record {
        Some(path) => {
            let (record_tx, record_rx) = mpsc::channel();
            let recorder = ProximityRecorder::new(&channels, cmd.fps, path.clone());
            let handle = run_component(Box::new(recorder), vector_rx, record_tx);
            (record_rx, Some(handle))
        }
        None => (vector_rx, None),
    };

    let mut sensor = DummySensor::new(cmd.width, cmd.height, cmd.fps, frame_tx);
    sensor.set_noise(cmd.noise);

    let deadline = Instant::now() + duration;
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        if wait.is_zero() {
            break;
        }
        match vector_rx.recv_timeout(wait) {
            Ok(vector) => player.update(vector),
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("sensor pipeline closed early");
                break;
            }
        }
    }

    // stopping the sensor closes the frame channel, which winds down every
    // stage behind it in turn
    sensor.stop();
    while let Ok(vector) = vector_rx.recv() {
        player.update(vector);
    }
    join(pipeline, "pipeline");
    if let Some(recorder) = recorder {
        join(recorder, "recorder");
    }

    player.finish()
}

fn photo<S>(config: &SonifyConfig, cmd: &PhotoCommand, sink: S) -> Result<(), SonifyError>
where
    S: CueSink + Send + 'static,
{
    let frame = read_frame_path(&cmd.frame)?;
    let vector = DepthPipeline::new(config).process(&frame)?;
    info!("{} -> {:?}", cmd.frame.display(), vector.as_slice());

    let mut player = SweepPlayer::new(AudioChannel::layout(config.zone_count), sink);
    player.play_once(config.tick_interval(), vector);
    player.wait();
    player.finish()
}

fn replay<S>(config: &SonifyConfig, cmd: &ReplayCommand, sink: S) -> Result<(), SonifyError>
where
    S: CueSink + Send + 'static,
{
    let log = ProximityLog::from_path(&cmd.log)?;
    if log.zone_count() != config.zone_count {
        info!(
            "{} was recorded with {} zones, using those",
            cmd.log.display(),
            log.zone_count()
        );
    }
    let frames = log.frames();
    let period = Duration::from_secs_f32(1.0 / log.frame_rate().max(0.1));

    let mut player = SweepPlayer::new(log.channels(), sink);
    let first = frames
        .first()
        .cloned()
        .unwrap_or_else(|| ProximityVector::silent(log.zone_count()));
    player.start(config.tick_interval(), first);

    for vector in frames {
        player.update(vector);
        spin_sleep::sleep(period);
    }

    player.stop();
    player.finish()
}
