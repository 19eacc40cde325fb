use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PpgError;

/// Tunables for the PPG pipeline.
///
/// The peak threshold and minimum peak distance are tuned for roughly 50 Hz
/// capture and are not rescaled when the sampling rate changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpgConfig {
    /// Capacity of the rolling signal buffer, in samples.
    pub window_size: usize,
    /// Number of trailing samples averaged by the smoother.
    pub moving_average_size: usize,
    /// Minimum normalized height for a local maximum to count as a beat.
    pub peak_threshold: f64,
    /// Minimum spacing between accepted peaks, in samples.
    pub min_peak_distance: usize,
    /// Initial sampling rate used to turn sample distances into time.
    pub sampling_rate_hz: f64,
    /// Frames between two heart-rate/HRV recomputations.
    pub calculation_cadence: usize,
    /// Filtered samples kept for the session quality metric.
    pub signal_history_len: usize,
}

impl Default for PpgConfig {
    fn default() -> Self {
        // 5 s at 50 Hz.
        Self {
            window_size: 250,
            moving_average_size: 5,
            peak_threshold: 0.6,
            min_peak_distance: 20,
            sampling_rate_hz: 50.0,
            calculation_cadence: 30,
            signal_history_len: 100,
        }
    }
}

impl PpgConfig {
    /// Load a (possibly partial) JSON document over the defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PpgError> {
        let text = fs::read_to_string(path)?;
        let config: PpgConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PpgError> {
        if self.window_size < 3 {
            return Err(PpgError::InvalidConfig(format!(
                "window_size must be at least 3, got {}",
                self.window_size
            )));
        }
        if self.moving_average_size == 0 || self.moving_average_size > self.window_size {
            return Err(PpgError::InvalidConfig(format!(
                "moving_average_size must be in 1..={}, got {}",
                self.window_size, self.moving_average_size
            )));
        }
        if !(0.0..1.0).contains(&self.peak_threshold) {
            return Err(PpgError::InvalidConfig(format!(
                "peak_threshold must be in [0, 1), got {}",
                self.peak_threshold
            )));
        }
        if self.min_peak_distance == 0 {
            return Err(PpgError::InvalidConfig(
                "min_peak_distance must be greater than zero".into(),
            ));
        }
        if self.calculation_cadence == 0 {
            return Err(PpgError::InvalidConfig(
                "calculation_cadence must be greater than zero".into(),
            ));
        }
        if self.signal_history_len == 0 {
            return Err(PpgError::InvalidConfig(
                "signal_history_len must be greater than zero".into(),
            ));
        }
        check_sampling_rate(self.sampling_rate_hz)
    }
}

pub(crate) fn check_sampling_rate(hz: f64) -> Result<(), PpgError> {
    if hz.is_finite() && hz > 0.0 {
        Ok(())
    } else {
        Err(PpgError::InvalidSampleRate(hz))
    }
}
