//! Error types for the signal chain

use thiserror::Error;

/// Result type alias using `DspError`
pub type Result<T> = std::result::Result<T, DspError>;

/// Signal chain errors
#[derive(Debug, Error)]
pub enum DspError {
    /// The platform audio subsystem could not be initialized.
    ///
    /// Fatal to the whole feature: surfaced once at context or sink
    /// construction and never retried automatically.
    #[error("Audio subsystem unavailable: {0}")]
    UnsupportedPlatform(String),

    /// Band index outside `[0, count)`. A defensive check; correct callers
    /// never hit this.
    #[error("Band index {index} out of range (0..{count})")]
    IndexOutOfRange { index: usize, count: usize },
}
