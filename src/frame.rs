//! Reduces a camera frame to one intensity sample.
//!
//! Only the luminance plane is read. The region of interest is a square of side
//! `min(width, height) / 4` centred on the frame, where the fingertip sits over
//! the lens and flash.
use crate::error::PpgError;

/// Borrowed single-channel plane, row-major with an explicit row stride.
#[derive(Clone, Copy, Debug)]
pub struct LumaPlane<'a> {
    pub width: usize,
    pub height: usize,
    pub row_stride: usize,
    pub data: &'a [u8],
}

impl<'a> LumaPlane<'a> {
    pub fn new(width: usize, height: usize, data: &'a [u8]) -> Self {
        Self {
            width,
            height,
            row_stride: width,
            data,
        }
    }

    pub fn with_row_stride(mut self, row_stride: usize) -> Self {
        self.row_stride = row_stride;
        self
    }

    /// Pixel bounds `(left, top, right, bottom)` of the central square, right/bottom exclusive.
    pub fn center_region(&self) -> (usize, usize, usize, usize) {
        let side = self.width.min(self.height) / 4;
        let left = (self.width / 2).saturating_sub(side / 2);
        let top = (self.height / 2).saturating_sub(side / 2);
        (left, top, left + side, top + side)
    }
}

/// Mean intensity over the central square. Pixels that fall outside the
/// buffer are skipped; with nothing left to average the result is 0.0.
pub fn center_mean_intensity(plane: &LumaPlane<'_>) -> f64 {
    let (left, top, right, bottom) = plane.center_region();
    let mut total = 0u64;
    let mut count = 0u64;
    for y in top..bottom {
        let row = y * plane.row_stride;
        for x in left..right.min(plane.width) {
            if let Some(&value) = plane.data.get(row + x) {
                total += u64::from(value);
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// A frame handed over by the camera pipeline.
///
/// The analyzer takes frames by value and drops them as soon as the sample is
/// taken, so implementations should release their underlying image on drop.
pub trait VideoFrame {
    fn luma_plane(&self) -> Result<LumaPlane<'_>, PpgError>;
}

/// Frame that owns its luminance bytes.
#[derive(Clone, Debug)]
pub struct OwnedLumaFrame {
    pub width: usize,
    pub height: usize,
    pub row_stride: usize,
    pub data: Vec<u8>,
}

impl OwnedLumaFrame {
    pub fn new(width: usize, height: usize, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            row_stride: width,
            data,
        }
    }

    /// Uniformly lit frame, mostly useful for playback and tests.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self::new(width, height, vec![value; width * height])
    }
}

impl VideoFrame for OwnedLumaFrame {
    fn luma_plane(&self) -> Result<LumaPlane<'_>, PpgError> {
        if self.row_stride < self.width {
            return Err(PpgError::MalformedFrame {
                width: self.width,
                height: self.height,
                row_stride: self.row_stride,
                reason: "row stride shorter than width",
            });
        }
        Ok(LumaPlane::new(self.width, self.height, &self.data).with_row_stride(self.row_stride))
    }
}
