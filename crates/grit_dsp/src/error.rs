//! DSP Error Types

use thiserror::Error;

/// Errors that can occur during DSP setup
#[derive(Error, Debug)]
pub enum DspError {
    #[error("Sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("Meter release time must be positive, got {0}ms")]
    InvalidReleaseTime(f32),

    #[error("Meter floor {floor}dB must be below ceiling {ceiling}dB")]
    InvalidMeterRange { floor: f32, ceiling: f32 },

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}
