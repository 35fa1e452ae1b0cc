use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum DaqError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("acquisition failed: {0}")]
    Acquisition(String),
    #[error("channel count mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("filter design failed: {0}")]
    Filter(String),
    #[error("statistics are undefined for an input without samples")]
    Stats,
    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed capture file: {0}")]
    Capture(String),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
/// Failures of the external transform extension point.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("transform unit not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("transform unit {} violates the contract: {reason}", .path.display())]
    Contract { path: PathBuf, reason: String },
    #[error("transform failed: {0}")]
    Processing(String),
}
impl From<csv::Error> for DaqError {
    fn from(value: csv::Error) -> Self {
        match value.into_kind() {
            csv::ErrorKind::Io(err) => DaqError::Io(err),
            other => DaqError::Capture(format!("{other:?}")),
        }
    }
}
#[cfg(feature = "hdf5")]
impl From<hdf5::Error> for DaqError {
    fn from(value: hdf5::Error) -> Self {
        DaqError::Capture(value.to_string())
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for DaqError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        DaqError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for DaqError {
    fn from(value: image::ImageError) -> Self {
        DaqError::Plot(value.to_string())
    }
}
