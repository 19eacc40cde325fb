//! Real-time photoplethysmography from camera frames.
//!
//! Each frame is reduced to one brightness sample, smoothed, and buffered.
//! Every few frames the buffered window is scanned for heartbeat peaks, from
//! which heart rate (BPM) and HRV (RMSSD) are derived.
pub mod analyzer;
pub mod buffer;
pub mod config;
pub mod error;
pub mod estimator;
pub mod filter;
pub mod frame;
pub mod peaks;
pub mod plot;
pub mod recorder;
pub mod session;
pub mod source;

pub use analyzer::{Estimate, PpgAnalyzer, PpgEvent, PpgObserver};
pub use buffer::SignalBuffer;
pub use config::PpgConfig;
pub use error::PpgError;
pub use filter::SignalFilter;
pub use frame::{center_mean_intensity, LumaPlane, OwnedLumaFrame, VideoFrame};
pub use peaks::PeakDetector;
pub use plot::{render_window_png, PlotStyle};
pub use recorder::TraceRecorder;
pub use session::{MeasurementRecord, MeasurementSession, SignalHistory};
pub use source::{FrameSource, ManualSource, SyntheticPulseSource};
