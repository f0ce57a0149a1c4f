use thiserror::Error;

/// Structural precondition violations. These are caller bugs; degenerate but
/// well-formed input (silence, empty peak sets) never produces an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("fft size must be a power of two, got {size}")]
    InvalidFftSize { size: usize },

    #[error("hop size must be in (0, {fft_size}], got {hop_size}")]
    InvalidHopSize { hop_size: usize, fft_size: usize },

    #[error("buffer length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("decibel range must satisfy min < max, got [{min}, {max}]")]
    InvalidDecibelRange { min: f32, max: f32 },

    #[error("sample rate mismatch: expected {expected} Hz, got {actual} Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
