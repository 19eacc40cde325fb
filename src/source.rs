use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::PpgError;
use crate::frame::OwnedLumaFrame;

/// Something that can yield camera frames on demand.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<OwnedLumaFrame>, PpgError>;

    /// Capture rate, when the source knows it.
    fn frame_rate_hz(&self) -> Option<f64> {
        None
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<OwnedLumaFrame>,
}

impl ManualSource {
    pub fn new(frames: impl IntoIterator<Item = OwnedLumaFrame>) -> Self {
        Self {
            queue: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for ManualSource {
    fn next_frame(&mut self) -> Result<Option<OwnedLumaFrame>, PpgError> {
        Ok(self.queue.pop_front())
    }
}

// Ordered dither period; the default 64x64 frame has a 16 px wide centre square.
const DITHER: usize = 16;

/// Renders a fingertip-over-flash pulse: brightness follows a sinusoid at
/// `bpm` with optional uniform noise.
pub struct SyntheticPulseSource {
    pub width: usize,
    pub height: usize,
    pub frame_rate_hz: f64,
    pub bpm: f64,
    pub baseline: f64,
    pub amplitude: f64,
    pub noise: f64,
    frame_index: usize,
    remaining: Option<usize>,
    rng: StdRng,
}

impl SyntheticPulseSource {
    pub fn new(frame_rate_hz: f64, bpm: f64) -> Result<Self, PpgError> {
        if !(frame_rate_hz.is_finite() && frame_rate_hz > 0.0) {
            return Err(PpgError::InvalidSampleRate(frame_rate_hz));
        }
        Ok(Self {
            width: 64,
            height: 64,
            frame_rate_hz,
            bpm,
            baseline: 128.0,
            amplitude: 30.0,
            noise: 0.0,
            frame_index: 0,
            remaining: None,
            rng: StdRng::seed_from_u64(0x5eed),
        })
    }

    pub fn with_noise(mut self, noise: f64, seed: u64) -> Self {
        self.noise = noise.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Stop after `frames` frames instead of running forever.
    pub fn with_limit(mut self, frames: usize) -> Self {
        self.remaining = Some(frames);
        self
    }

    fn level(&mut self) -> f64 {
        let t = self.frame_index as f64 / self.frame_rate_hz;
        let pulse = (2.0 * PI * self.bpm / 60.0 * t).sin();
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        self.baseline + self.amplitude * pulse + jitter
    }

    /// Ordered dithering keeps sub-integer brightness in the centre-square mean.
    fn render(&self, level: f64) -> OwnedLumaFrame {
        let level = level.clamp(0.0, 254.0);
        let base = level.floor();
        let lit = ((level - base) * DITHER as f64).round() as usize;
        let base = base as u8;
        let width = self.width;
        let data = (0..self.height)
            .flat_map(|y| (0..width).map(move |x| base + u8::from((x + 3 * y) % DITHER < lit)))
            .collect();
        OwnedLumaFrame::new(self.width, self.height, data)
    }
}

impl FrameSource for SyntheticPulseSource {
    fn next_frame(&mut self) -> Result<Option<OwnedLumaFrame>, PpgError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        let level = self.level();
        self.frame_index += 1;
        Ok(Some(self.render(level)))
    }

    fn frame_rate_hz(&self) -> Option<f64> {
        Some(self.frame_rate_hz)
    }
}
