/// Result alias that carries the custom [`SpectralError`] type.
pub type Result<T> = std::result::Result<T, SpectralError>;

/// Common error type for the core crate.
///
/// None of these ever escape the per-tick update path; they only surface from
/// configuration loading, the transform primitive, and the shared ingest slot.
#[derive(Debug, thiserror::Error)]
pub enum SpectralError {
    /// Free-form message for failures without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Caller handed over data the pipeline cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration files that fail to parse.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
    /// Errors reported by the FFT backend.
    #[error("transform failed: {0}")]
    Fft(#[from] realfft::FftError),
}

impl SpectralError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for SpectralError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SpectralError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
