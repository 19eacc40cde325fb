use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::info;
use serde::{Deserialize, Serialize};

use crate::analyzer::PpgAnalyzer;

/// Most recent filtered samples, kept for the session quality metric.
#[derive(Clone, Debug)]
pub struct SignalHistory {
    values: VecDeque<f64>,
    capacity: usize,
}

impl SignalHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `1 / (1 + variance)`: 1.0 for a perfectly steady trace, towards 0 as it gets noisier.
    pub fn quality(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let n = self.values.len() as f64;
        let mean = self.values.iter().sum::<f64>() / n;
        let variance = self
            .values
            .iter()
            .map(|v| {
                let delta = v - mean;
                delta * delta
            })
            .sum::<f64>()
            / n;
        1.0 / (1.0 + variance)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}

/// Summary of one finished measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Unix time in milliseconds when the measurement ended.
    pub timestamp_ms: u64,
    /// Last reported heart rate, 0 if none was available.
    pub heart_rate_bpm: f64,
    /// Last reported RMSSD, 0 if none was available.
    pub hrv_rmssd_ms: f64,
    pub signal_quality: f64,
    pub duration_ms: u64,
}

/// Start/stop bookkeeping around a shared analyzer.
pub struct MeasurementSession {
    analyzer: Arc<PpgAnalyzer>,
    started: Option<Instant>,
}

impl MeasurementSession {
    pub fn new(analyzer: Arc<PpgAnalyzer>) -> Self {
        Self {
            analyzer,
            started: None,
        }
    }

    pub fn analyzer(&self) -> &Arc<PpgAnalyzer> {
        &self.analyzer
    }

    pub fn is_measuring(&self) -> bool {
        self.started.is_some()
    }

    /// Clears the pipeline and starts the clock.
    pub fn start(&mut self) {
        self.analyzer.reset();
        self.started = Some(Instant::now());
        info!("measurement started");
    }

    /// Ends the measurement. Returns `None` when no measurement was running.
    pub fn finish(&mut self) -> Option<MeasurementRecord> {
        let started = self.started.take()?;
        let duration_ms = started.elapsed().as_millis() as u64;
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        let record = MeasurementRecord {
            timestamp_ms,
            heart_rate_bpm: self.analyzer.latest_heart_rate().unwrap_or(0.0),
            hrv_rmssd_ms: self.analyzer.latest_hrv().unwrap_or(0.0),
            signal_quality: self.analyzer.signal_quality(),
            duration_ms,
        };
        info!(
            "measurement finished: {:.0} bpm, rmssd {:.1} ms, quality {:.3}",
            record.heart_rate_bpm, record.hrv_rmssd_ms, record.signal_quality
        );
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_of_steady_and_noisy_traces() {
        let mut history = SignalHistory::with_capacity(4);
        assert_eq!(history.quality(), 0.0);
        for _ in 0..4 {
            history.push(7.0);
        }
        assert_eq!(history.quality(), 1.0);
        // 1, 3, 1, 3 -> variance 1
        for v in [1.0, 3.0, 1.0, 3.0] {
            history.push(v);
        }
        assert_eq!(history.len(), 4);
        assert!((history.quality() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn finish_without_start_is_none() {
        let mut session = MeasurementSession::new(Arc::new(PpgAnalyzer::default()));
        assert!(session.finish().is_none());
    }

    #[test]
    fn record_without_estimates_uses_zero() {
        let analyzer = Arc::new(PpgAnalyzer::default());
        let mut session = MeasurementSession::new(Arc::clone(&analyzer));
        session.start();
        assert!(session.is_measuring());
        for _ in 0..10 {
            analyzer.process_sample(120.0);
        }
        let record = session.finish().unwrap();
        assert!(!session.is_measuring());
        assert_eq!(record.heart_rate_bpm, 0.0);
        assert_eq!(record.hrv_rmssd_ms, 0.0);
        assert_eq!(record.signal_quality, 1.0);
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"signal_quality\":1.0"));
    }
}
