use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::error::PpgError;

/// Writes one CSV row per processed frame for offline inspection.
///
/// Columns: `frame,time_s,signal,heart_rate_bpm,hrv_rmssd_ms`. The estimate
/// columns are empty except on frames where an estimate was reported.
pub struct TraceRecorder {
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    sampling_rate_hz: f64,
    rows: usize,
}

impl TraceRecorder {
    pub fn new(sampling_rate_hz: f64) -> Self {
        Self {
            writer: None,
            path: None,
            sampling_rate_hz,
            rows: 0,
        }
    }

    pub fn start(&mut self, path: impl AsRef<Path>) -> Result<(), PpgError> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(w, "frame,time_s,signal,heart_rate_bpm,hrv_rmssd_ms")?;
        self.writer = Some(w);
        self.path = Some(path.to_path_buf());
        self.rows = 0;
        info!("recording trace to {}", path.display());
        Ok(())
    }

    pub fn write_frame(
        &mut self,
        frame: usize,
        signal: f64,
        heart_rate_bpm: Option<f64>,
        hrv_rmssd_ms: Option<f64>,
    ) -> Result<(), PpgError> {
        let Some(w) = self.writer.as_mut() else {
            return Ok(());
        };
        let t = frame as f64 / self.sampling_rate_hz;
        write!(w, "{frame},{t:.4},{signal:.4},")?;
        if let Some(bpm) = heart_rate_bpm {
            write!(w, "{bpm:.0}")?;
        }
        write!(w, ",")?;
        if let Some(rmssd) = hrv_rmssd_ms {
            write!(w, "{rmssd:.2}")?;
        }
        writeln!(w)?;
        self.rows += 1;
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), PpgError> {
        if let Some(mut w) = self.writer.take() {
            w.flush()?;
            if let Some(path) = self.path.take() {
                info!("trace saved: {} rows in {}", self.rows, path.display());
            }
        }
        Ok(())
    }

    pub fn is_recording(&self) -> bool {
        self.writer.is_some()
    }
}
