use std::collections::VecDeque;

/// Fixed-capacity FIFO of the most recent raw samples.
#[derive(Clone, Debug)]
pub struct SignalBuffer {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SignalBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest once the buffer is full.
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Mean of the newest `count` samples, `None` until that many are buffered.
    pub fn tail_mean(&self, count: usize) -> Option<f64> {
        if count == 0 || self.samples.len() < count {
            return None;
        }
        let sum: f64 = self.samples.iter().rev().take(count).sum();
        Some(sum / count as f64)
    }

    /// Oldest-first copy of the buffered samples.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
