use ndarray::Array1;

use crate::buffer::SignalBuffer;

/// Threshold + refractory peak picker over a full signal window.
#[derive(Clone, Debug)]
pub struct PeakDetector {
    threshold: f64,
    min_distance: usize,
    last_peak: Option<usize>,
}

impl PeakDetector {
    pub fn new(threshold: f64, min_distance: usize) -> Self {
        Self {
            threshold,
            min_distance,
            last_peak: None,
        }
    }

    /// Window index of the most recently accepted peak, `None` before the first
    /// accepted peak and after a reset.
    pub fn last_peak(&self) -> Option<usize> {
        self.last_peak
    }

    /// Finds heartbeat peaks in the buffered window.
    ///
    /// Returns nothing until the buffer is full. The scan is a single greedy
    /// left-to-right pass over interior points: a point qualifies when it is a
    /// strict local maximum, its normalized height exceeds the threshold, and it
    /// lies at least `min_distance` samples after the previously accepted peak.
    pub fn detect(&mut self, buffer: &SignalBuffer) -> Vec<usize> {
        if !buffer.is_full() {
            return Vec::new();
        }
        let normalized = normalize(&buffer.snapshot());
        let n = normalized.len();
        let mut peaks = Vec::new();
        let mut last: Option<usize> = None;
        for i in 1..n.saturating_sub(1) {
            let value = normalized[i];
            let is_local_max = value > normalized[i - 1] && value > normalized[i + 1];
            if !is_local_max || value <= self.threshold {
                continue;
            }
            if last.map_or(true, |prev| i - prev >= self.min_distance) {
                peaks.push(i);
                last = Some(i);
            }
        }
        self.last_peak = last;
        peaks
    }

    pub fn reset(&mut self) {
        self.last_peak = None;
    }
}

/// Min-max normalization to `[0, 1]`. A flat window maps to all zeros.
pub fn normalize(window: &[f64]) -> Array1<f64> {
    let signal = Array1::from_vec(window.to_vec());
    let min = signal.fold(f64::INFINITY, |acc, &v| acc.min(v));
    let max = signal.fold(f64::NEG_INFINITY, |acc, &v| acc.max(v));
    let range = max - min;
    if range > 0.0 {
        signal.mapv(|v| (v - min) / range)
    } else {
        Array1::zeros(signal.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn filled(values: impl IntoIterator<Item = f64>, capacity: usize) -> SignalBuffer {
        let mut buffer = SignalBuffer::with_capacity(capacity);
        for v in values {
            buffer.push(v);
        }
        buffer
    }

    #[test]
    fn nothing_before_the_window_is_full() {
        let mut detector = PeakDetector::new(0.6, 20);
        let buffer = filled((0..249).map(|i| (i % 25) as f64), 250);
        assert!(detector.detect(&buffer).is_empty());
        assert_eq!(detector.last_peak(), None);
    }

    #[test]
    fn flat_window_has_no_peaks() {
        let mut detector = PeakDetector::new(0.6, 20);
        let buffer = filled(std::iter::repeat(100.0).take(250), 250);
        assert!(normalize(&buffer.snapshot()).iter().all(|&v| v == 0.0));
        assert!(detector.detect(&buffer).is_empty());
    }

    #[test]
    fn enforces_minimum_spacing() {
        // spikes every 10 samples; only every other one survives the refractory gate
        let mut detector = PeakDetector::new(0.6, 20);
        let buffer = filled((0..250).map(|i| if i % 10 == 5 { 1.0 } else { 0.0 }), 250);
        let peaks = detector.detect(&buffer);
        assert_eq!(peaks.first(), Some(&5));
        assert_eq!(peaks.len(), 13);
        assert!(peaks.windows(2).all(|w| w[1] - w[0] >= 20));
        assert_eq!(detector.last_peak(), Some(245));
    }

    #[test]
    fn finds_sine_crests() {
        let mut detector = PeakDetector::new(0.6, 20);
        let buffer = filled((0..250).map(|i| (2.0 * PI * i as f64 / 25.0).sin()), 250);
        let peaks = detector.detect(&buffer);
        assert_eq!(peaks.len(), 10);
        assert!(peaks.windows(2).all(|w| w[1] - w[0] == 25));
        // repeated detection over an unchanged window is stable
        assert_eq!(detector.detect(&buffer), peaks);
        detector.reset();
        assert_eq!(detector.last_peak(), None);
    }

    #[test]
    fn endpoints_are_never_peaks() {
        let mut detector = PeakDetector::new(0.6, 20);
        let mut values = vec![0.0; 250];
        values[0] = 1.0;
        values[249] = 1.0;
        let buffer = filled(values, 250);
        assert!(detector.detect(&buffer).is_empty());
    }
}
