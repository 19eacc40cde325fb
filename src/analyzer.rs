use std::sync::mpsc::Sender;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};

use crate::config::{check_sampling_rate, PpgConfig};
use crate::error::PpgError;
use crate::estimator::{heart_rate_bpm, rmssd_ms};
use crate::filter::SignalFilter;
use crate::frame::{center_mean_intensity, VideoFrame};
use crate::peaks::PeakDetector;
use crate::session::SignalHistory;

/// Notifications emitted by the analyzer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PpgEvent {
    /// Smoothed sample, once per accepted frame.
    Signal(f64),
    /// Heart rate rounded to whole BPM.
    HeartRate(f64),
    /// RMSSD in milliseconds.
    Hrv(f64),
}

/// Receives analyzer notifications synchronously on the thread that fed the frame.
pub trait PpgObserver: Send + Sync {
    fn on_signal_update(&self, _value: f64) {}
    fn on_heart_rate(&self, _bpm: f64) {}
    fn on_hrv(&self, _rmssd_ms: f64) {}
}

impl PpgObserver for Sender<PpgEvent> {
    fn on_signal_update(&self, value: f64) {
        self.send(PpgEvent::Signal(value)).ok();
    }
    fn on_heart_rate(&self, bpm: f64) {
        self.send(PpgEvent::HeartRate(bpm)).ok();
    }
    fn on_hrv(&self, rmssd_ms: f64) {
        self.send(PpgEvent::Hrv(rmssd_ms)).ok();
    }
}

/// Peaks and estimates for the current window.
#[derive(Clone, Debug, PartialEq)]
pub struct Estimate {
    pub peaks: Vec<usize>,
    pub heart_rate_bpm: f64,
    pub hrv_rmssd_ms: f64,
}

struct AnalyzerState {
    filter: SignalFilter,
    detector: PeakDetector,
    sampling_rate_hz: f64,
    frames_since_last_calculation: usize,
    history: SignalHistory,
    latest_heart_rate: Option<f64>,
    latest_hrv: Option<f64>,
}

impl AnalyzerState {
    fn new(config: &PpgConfig) -> Self {
        Self {
            filter: SignalFilter::new(config.window_size, config.moving_average_size),
            detector: PeakDetector::new(config.peak_threshold, config.min_peak_distance),
            sampling_rate_hz: config.sampling_rate_hz,
            frames_since_last_calculation: 0,
            history: SignalHistory::with_capacity(config.signal_history_len),
            latest_heart_rate: None,
            latest_hrv: None,
        }
    }

    fn estimate(&mut self) -> Estimate {
        let peaks = self.detector.detect(self.filter.buffer());
        Estimate {
            heart_rate_bpm: heart_rate_bpm(&peaks, self.sampling_rate_hz),
            hrv_rmssd_ms: rmssd_ms(&peaks, self.sampling_rate_hz),
            peaks,
        }
    }

    /// One pipeline step; returns the notifications in delivery order.
    fn advance(&mut self, sample: f64, cadence: usize) -> Vec<PpgEvent> {
        let filtered = self.filter.process(sample);
        self.history.push(filtered);
        let mut events = vec![PpgEvent::Signal(filtered)];

        self.frames_since_last_calculation += 1;
        if self.frames_since_last_calculation >= cadence {
            let estimate = self.estimate();
            debug!(
                "{} peaks, hr {:.2} bpm, rmssd {:.2} ms",
                estimate.peaks.len(),
                estimate.heart_rate_bpm,
                estimate.hrv_rmssd_ms
            );
            if estimate.heart_rate_bpm > 0.0 {
                let bpm = estimate.heart_rate_bpm.round();
                self.latest_heart_rate = Some(bpm);
                events.push(PpgEvent::HeartRate(bpm));
            }
            if estimate.hrv_rmssd_ms > 0.0 {
                self.latest_hrv = Some(estimate.hrv_rmssd_ms);
                events.push(PpgEvent::Hrv(estimate.hrv_rmssd_ms));
            }
            self.frames_since_last_calculation = 0;
        }
        events
    }

    fn clear(&mut self) {
        self.filter.reset();
        self.detector.reset();
        self.frames_since_last_calculation = 0;
        self.history.clear();
        self.latest_heart_rate = None;
        self.latest_hrv = None;
    }
}

/// Per-frame PPG pipeline: sample, smooth, and every `calculation_cadence`
/// frames re-estimate heart rate and HRV.
///
/// All state sits behind one mutex, so `reset` and `set_sampling_rate` may be
/// called from another thread without ever splitting a frame step.
pub struct PpgAnalyzer {
    config: PpgConfig,
    state: Mutex<AnalyzerState>,
    observers: Vec<Box<dyn PpgObserver>>,
}

impl Default for PpgAnalyzer {
    fn default() -> Self {
        Self::from_valid_config(PpgConfig::default())
    }
}

impl PpgAnalyzer {
    pub fn new(config: PpgConfig) -> Result<Self, PpgError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: PpgConfig) -> Self {
        let state = Mutex::new(AnalyzerState::new(&config));
        Self {
            config,
            state,
            observers: Vec::new(),
        }
    }

    pub fn add_observer(&mut self, observer: impl PpgObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn config(&self) -> &PpgConfig {
        &self.config
    }

    /// Samples `frame`, releases it, and runs one pipeline step.
    ///
    /// A frame whose plane cannot be read is logged and dropped; the pipeline
    /// state is left untouched.
    pub fn process_frame<F: VideoFrame>(&self, frame: F) {
        let sample = frame.luma_plane().map(|plane| center_mean_intensity(&plane));
        drop(frame);
        match sample {
            Ok(sample) => self.process_sample(sample),
            Err(err) => warn!("dropping frame: {err}"),
        }
    }

    /// Runs one pipeline step on an intensity that was already reduced from a frame.
    pub fn process_sample(&self, sample: f64) {
        if !sample.is_finite() {
            warn!("dropping frame: {}", PpgError::NonFiniteSample);
            return;
        }
        let events = self
            .lock_state()
            .advance(sample, self.config.calculation_cadence);
        for event in events {
            self.dispatch(event);
        }
    }

    fn dispatch(&self, event: PpgEvent) {
        for observer in &self.observers {
            match event {
                PpgEvent::Signal(value) => observer.on_signal_update(value),
                PpgEvent::HeartRate(bpm) => observer.on_heart_rate(bpm),
                PpgEvent::Hrv(rmssd) => observer.on_hrv(rmssd),
            }
        }
    }

    /// Clears the buffer, peak marker, frame counter and session history.
    pub fn reset(&self) {
        self.lock_state().clear();
        info!("analyzer reset");
    }

    /// Applies to estimates computed from now on; buffered samples are not rescaled.
    pub fn set_sampling_rate(&self, hz: f64) -> Result<(), PpgError> {
        check_sampling_rate(hz)?;
        self.lock_state().sampling_rate_hz = hz;
        debug!("sampling rate set to {hz} Hz");
        Ok(())
    }

    pub fn sampling_rate_hz(&self) -> f64 {
        self.lock_state().sampling_rate_hz
    }

    /// Runs peak detection and both estimators on the current window.
    pub fn estimate(&self) -> Estimate {
        self.lock_state().estimate()
    }

    pub fn detect_peaks(&self) -> Vec<usize> {
        self.estimate().peaks
    }

    /// Oldest-first copy of the raw window.
    pub fn window(&self) -> Vec<f64> {
        self.lock_state().filter.buffer().snapshot()
    }

    pub fn buffer_len(&self) -> usize {
        self.lock_state().filter.buffer().len()
    }

    pub fn last_peak(&self) -> Option<usize> {
        self.lock_state().detector.last_peak()
    }

    pub fn frames_since_last_calculation(&self) -> usize {
        self.lock_state().frames_since_last_calculation
    }

    pub fn signal_quality(&self) -> f64 {
        self.lock_state().history.quality()
    }

    pub fn latest_heart_rate(&self) -> Option<f64> {
        self.lock_state().latest_heart_rate
    }

    pub fn latest_hrv(&self) -> Option<f64> {
        self.lock_state().latest_hrv
    }

    fn lock_state(&self) -> MutexGuard<'_, AnalyzerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::OwnedLumaFrame;
    use std::f64::consts::PI;
    use std::sync::mpsc::{channel, Receiver};
    use std::sync::Arc;
    use std::thread;

    fn analyzer_with_channel() -> (PpgAnalyzer, Receiver<PpgEvent>) {
        let (tx, rx) = channel();
        let mut analyzer = PpgAnalyzer::default();
        analyzer.add_observer(tx);
        (analyzer, rx)
    }

    fn sine(i: usize) -> f64 {
        100.0 + 20.0 * (2.0 * PI * i as f64 / 25.0).sin()
    }

    #[test]
    fn estimates_fire_only_on_cadence_frames() {
        let (analyzer, rx) = analyzer_with_channel();
        let mut heart_rate_frames = Vec::new();
        let mut hrv_events = 0;
        for i in 0..310 {
            analyzer.process_sample(sine(i));
            let events: Vec<PpgEvent> = rx.try_iter().collect();
            assert!(matches!(events[0], PpgEvent::Signal(_)));
            for event in &events[1..] {
                match event {
                    PpgEvent::HeartRate(bpm) => {
                        assert_eq!(*bpm, 120.0);
                        heart_rate_frames.push(i + 1);
                    }
                    PpgEvent::Hrv(_) => hrv_events += 1,
                    PpgEvent::Signal(_) => panic!("one signal update per frame"),
                }
            }
        }
        // window fills at frame 250; the next two cadence points are 270 and 300
        assert_eq!(heart_rate_frames, vec![270, 300]);
        // perfectly regular rhythm: RMSSD is zero and therefore suppressed
        assert_eq!(hrv_events, 0);
        assert_eq!(analyzer.latest_heart_rate(), Some(120.0));
        assert_eq!(analyzer.frames_since_last_calculation(), 10);
    }

    #[test]
    fn sine_scenario_reports_120_bpm() {
        let analyzer = PpgAnalyzer::default();
        for i in 0..300 {
            analyzer.process_sample(sine(i));
        }
        assert_eq!(analyzer.buffer_len(), 250);
        let estimate = analyzer.estimate();
        assert!((estimate.heart_rate_bpm - 120.0).abs() <= 1.0);
        assert_eq!(estimate.hrv_rmssd_ms, 0.0);
        assert!(estimate.peaks.windows(2).all(|w| w[1] - w[0] >= 20));
    }

    #[test]
    fn alternating_rhythm_reports_hrv() {
        let (analyzer, rx) = analyzer_with_channel();
        // beats alternate 20 and 30 samples apart: 25, 45, 75, 95, ...
        let is_beat = |i: usize| i % 50 == 25 || i % 50 == 45;
        for i in 0..270 {
            analyzer.process_sample(if is_beat(i) { 150.0 } else { 100.0 });
        }
        let events: Vec<PpgEvent> = rx
            .try_iter()
            .filter(|e| !matches!(e, PpgEvent::Signal(_)))
            .collect();
        assert_eq!(events.len(), 2);
        // nine gaps averaging 220 / 9 samples -> 122.7 bpm, rounded
        assert_eq!(events[0], PpgEvent::HeartRate(123.0));
        match events[1] {
            PpgEvent::Hrv(rmssd) => assert!((rmssd - 200.0).abs() < 1e-6),
            other => panic!("expected hrv, got {other:?}"),
        }
    }

    #[test]
    fn flat_signal_scenario() {
        let (analyzer, rx) = analyzer_with_channel();
        for _ in 0..250 {
            analyzer.process_frame(OwnedLumaFrame::filled(64, 48, 100));
        }
        assert_eq!(analyzer.buffer_len(), 250);
        assert!(analyzer.detect_peaks().is_empty());
        let estimate = analyzer.estimate();
        assert_eq!(estimate.heart_rate_bpm, 0.0);
        assert_eq!(estimate.hrv_rmssd_ms, 0.0);
        let events: Vec<PpgEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 250);
        assert!(events.iter().all(|e| *e == PpgEvent::Signal(100.0)));
    }

    #[test]
    fn bad_frames_leave_state_untouched() {
        let (analyzer, rx) = analyzer_with_channel();
        for _ in 0..7 {
            analyzer.process_frame(OwnedLumaFrame::filled(32, 32, 80));
        }
        rx.try_iter().count();
        let mut broken = OwnedLumaFrame::filled(32, 32, 80);
        broken.row_stride = 8;
        analyzer.process_frame(broken);
        analyzer.process_sample(f64::NAN);
        assert_eq!(rx.try_iter().count(), 0);
        assert_eq!(analyzer.buffer_len(), 7);
        assert_eq!(analyzer.frames_since_last_calculation(), 7);
        // still ready for the next frame
        analyzer.process_frame(OwnedLumaFrame::filled(32, 32, 80));
        assert_eq!(analyzer.buffer_len(), 8);
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let analyzer = PpgAnalyzer::default();
        analyzer.reset();
        assert_eq!(analyzer.buffer_len(), 0);
        assert_eq!(analyzer.last_peak(), None);
        assert_eq!(analyzer.frames_since_last_calculation(), 0);

        for i in 0..280 {
            analyzer.process_sample(sine(i));
        }
        assert!(analyzer.last_peak().is_some());
        analyzer.reset();
        assert_eq!(analyzer.buffer_len(), 0);
        assert_eq!(analyzer.last_peak(), None);
        assert_eq!(analyzer.frames_since_last_calculation(), 0);
        assert_eq!(analyzer.signal_quality(), 0.0);
        assert_eq!(analyzer.latest_heart_rate(), None);
    }

    #[test]
    fn sampling_rate_changes_later_estimates() {
        let analyzer = PpgAnalyzer::default();
        for i in 0..250 {
            analyzer.process_sample(sine(i));
        }
        analyzer.set_sampling_rate(25.0).unwrap();
        assert!((analyzer.estimate().heart_rate_bpm - 60.0).abs() < 1e-9);
        assert!(matches!(
            analyzer.set_sampling_rate(0.0),
            Err(PpgError::InvalidSampleRate(_))
        ));
        assert!(analyzer.set_sampling_rate(f64::INFINITY).is_err());
        assert_eq!(analyzer.sampling_rate_hz(), 25.0);
    }

    #[test]
    fn reset_from_another_thread() {
        let analyzer = Arc::new(PpgAnalyzer::default());
        let worker = {
            let analyzer = Arc::clone(&analyzer);
            thread::spawn(move || {
                for i in 0..2000 {
                    analyzer.process_sample(sine(i));
                }
            })
        };
        for _ in 0..50 {
            analyzer.reset();
            assert!(analyzer.buffer_len() <= 250);
        }
        worker.join().unwrap();
        assert!(analyzer.buffer_len() <= 250);
        assert!(analyzer.frames_since_last_calculation() < 30);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = PpgConfig {
            calculation_cadence: 0,
            ..PpgConfig::default()
        };
        assert!(PpgAnalyzer::new(config).is_err());
    }
}
