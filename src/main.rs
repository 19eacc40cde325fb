// src/main.rs
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use pulsecam::{
    render_window_png, FrameSource, MeasurementSession, PlotStyle, PpgAnalyzer, PpgConfig,
    PpgEvent, SyntheticPulseSource, TraceRecorder,
};

/// Runs the PPG pipeline over a simulated fingertip recording.
#[derive(Parser, Debug)]
#[command(name = "pulsecam", version)]
struct Args {
    /// JSON file with pipeline tunables; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of frames to simulate.
    #[arg(long, default_value_t = 1500)]
    frames: usize,
    /// Simulated camera frame rate.
    #[arg(long, default_value_t = 50.0)]
    fps: f64,
    /// Simulated pulse rate.
    #[arg(long, default_value_t = 72.0)]
    bpm: f64,
    /// Peak-to-peak brightness noise added to every frame.
    #[arg(long, default_value_t = 0.0)]
    noise: f64,
    /// Seed for the noise generator.
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Write a per-frame CSV trace here.
    #[arg(long)]
    trace: Option<PathBuf>,
    /// Render the final signal window with its peaks to this PNG.
    #[arg(long)]
    plot: Option<PathBuf>,
    /// Save the measurement summary as JSON here.
    #[arg(long)]
    record: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => PpgConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PpgConfig::default(),
    };
    let mut source = SyntheticPulseSource::new(args.fps, args.bpm)?
        .with_noise(args.noise / 2.0, args.seed)
        .with_limit(args.frames);

    let (tx, rx) = channel();
    let mut analyzer = PpgAnalyzer::new(config)?;
    analyzer.add_observer(tx);
    let analyzer = Arc::new(analyzer);
    if let Some(hz) = source.frame_rate_hz() {
        analyzer.set_sampling_rate(hz)?;
    }

    let mut recorder = TraceRecorder::new(analyzer.sampling_rate_hz());
    if let Some(path) = &args.trace {
        recorder
            .start(path)
            .with_context(|| format!("creating trace {}", path.display()))?;
    }

    let mut session = MeasurementSession::new(Arc::clone(&analyzer));
    session.start();

    let mut frame_index = 0usize;
    while let Some(frame) = source.next_frame()? {
        analyzer.process_frame(frame);
        let mut signal = None;
        let mut heart_rate = None;
        let mut hrv = None;
        for event in rx.try_iter() {
            match event {
                PpgEvent::Signal(v) => signal = Some(v),
                PpgEvent::HeartRate(bpm) => {
                    info!("frame {frame_index}: heart rate {bpm:.0} bpm");
                    heart_rate = Some(bpm);
                }
                PpgEvent::Hrv(rmssd) => {
                    info!("frame {frame_index}: rmssd {rmssd:.1} ms");
                    hrv = Some(rmssd);
                }
            }
        }
        if let Some(signal) = signal {
            recorder.write_frame(frame_index, signal, heart_rate, hrv)?;
        }
        frame_index += 1;
    }
    recorder.stop()?;

    if let Some(path) = &args.plot {
        let estimate = analyzer.estimate();
        let png = render_window_png(&analyzer.window(), &estimate.peaks, &PlotStyle::default())?;
        fs::write(path, png).with_context(|| format!("writing plot {}", path.display()))?;
        info!("plot saved to {}", path.display());
    }

    let record = session
        .finish()
        .context("measurement was not running")?;
    let json = serde_json::to_string_pretty(&record)?;
    if let Some(path) = &args.record {
        fs::write(path, &json).with_context(|| format!("writing record {}", path.display()))?;
    }
    println!("{json}");
    Ok(())
}
