use thiserror::Error;
#[derive(Debug, Error)]
pub enum PpgError {
    #[error("sampling rate must be finite and greater than zero, got {0}")]
    InvalidSampleRate(f64),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("malformed frame {width}x{height} (stride {row_stride}): {reason}")]
    MalformedFrame {
        width: usize,
        height: usize,
        row_stride: usize,
        reason: &'static str,
    },
    #[error("frame produced a non-finite intensity sample")]
    NonFiniteSample,
    #[error("signal window is empty; feed at least one frame first")]
    EmptyWindow,
    #[error("failed to render plot: {0}")]
    Plot(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for PpgError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        PpgError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for PpgError {
    fn from(value: image::ImageError) -> Self {
        PpgError::Plot(value.to_string())
    }
}
