use crate::buffer::SignalBuffer;

/// Rolling window plus a trailing moving-average smoother.
///
/// The window keeps raw samples; the smoothed value is only handed back to the
/// caller. Peak detection therefore runs on the raw window.
#[derive(Clone, Debug)]
pub struct SignalFilter {
    buffer: SignalBuffer,
    smoothing: usize,
}

impl SignalFilter {
    pub fn new(window_size: usize, smoothing: usize) -> Self {
        Self {
            buffer: SignalBuffer::with_capacity(window_size),
            smoothing,
        }
    }

    /// Buffers `sample` and returns the mean of the last `smoothing` samples,
    /// or `sample` itself while the smoother is still warming up.
    pub fn process(&mut self, sample: f64) -> f64 {
        self.buffer.push(sample);
        self.buffer.tail_mean(self.smoothing).unwrap_or(sample)
    }

    pub fn buffer(&self) -> &SignalBuffer {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_samples_through_during_warm_up() {
        let mut filter = SignalFilter::new(250, 5);
        for sample in [10.0, 30.0, 20.0, 50.0] {
            assert_eq!(filter.process(sample), sample);
        }
    }

    #[test]
    fn averages_last_five_samples() {
        let mut filter = SignalFilter::new(250, 5);
        let inputs = [10.0, 30.0, 20.0, 50.0, 40.0, 100.0];
        let outputs: Vec<f64> = inputs.iter().map(|&s| filter.process(s)).collect();
        assert_eq!(outputs[4], 30.0); // (10+30+20+50+40)/5
        assert_eq!(outputs[5], 48.0); // (30+20+50+40+100)/5
    }

    #[test]
    fn buffer_stays_bounded() {
        let mut filter = SignalFilter::new(250, 5);
        for i in 0..600 {
            filter.process(i as f64);
            assert!(filter.buffer().len() <= 250);
        }
        assert_eq!(filter.buffer().len(), 250);
        filter.reset();
        assert!(filter.buffer().is_empty());
    }
}
