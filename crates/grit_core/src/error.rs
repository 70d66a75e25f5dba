//! Core Error Types

use thiserror::Error;

/// Errors that can occur while setting up or controlling the signal chain
///
/// Nothing on the audio thread returns these: `process` has no error path.
#[derive(Error, Debug)]
pub enum GritError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid block size: {0} (must be 1-8192)")]
    InvalidBlockSize(usize),

    #[error("Unsupported channel count: {0} (mono or stereo only)")]
    UnsupportedChannels(usize),

    #[error("DSP error: {0}")]
    DspError(#[from] grit_dsp::DspError),

    #[error("Failed to decode parameter state: {0}")]
    StateError(#[from] serde_json::Error),

    #[error("Failed to spawn meter thread: {0}")]
    ThreadSpawnError(String),
}

/// Result type alias for core operations
pub type GritResult<T> = Result<T, GritError>;
