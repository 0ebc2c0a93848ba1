use thiserror::Error;
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("record has no fields")]
    EmptyRecord,
    #[error("field {position} is not a number: {token:?}")]
    MalformedRecord { token: String, position: usize },
    #[error("field count mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },
    #[error("no rows appended yet; feed at least one record first")]
    NoData,
    #[error("session is closed; no further rows are accepted")]
    SessionClosed,
    #[error("channel {index} out of range (session has {channels} channels)")]
    UnknownChannel { index: usize, channels: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for TelemetryError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        TelemetryError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for TelemetryError {
    fn from(value: image::ImageError) -> Self {
        TelemetryError::Plot(value.to_string())
    }
}
