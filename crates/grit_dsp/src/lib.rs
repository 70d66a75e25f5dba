//! Grit DSP - Digital Signal Processing Module
//!
//! This crate provides the building blocks of the Grit distortion, including:
//! - Odd, bounded tanh shaping curve with drive-controlled hardness
//! - Gain staging (drive boost, range compensation) around the curve
//! - Exact dry/wet blending
//! - Lock-free peak envelope meters for display
//!
//! # Architecture
//!
//! Every stage except the meter is a pure function or a `Copy` value built
//! once per block, so nothing here allocates or locks on the audio thread.
//! The meter keeps its envelope in an atomic so another thread can read it.

mod blend;
mod error;
mod gain;
mod meter;
mod processor;
mod shaper;

pub use blend::mix;
pub use error::DspError;
pub use gain::{db_to_linear, GainStage, MAX_DRIVE_DB, NOMINAL_LEVEL};
pub use meter::{
    linear_to_db, LevelMeter, DEFAULT_CEILING_DB, DEFAULT_FLOOR_DB, DEFAULT_RELEASE_MS,
};
pub use processor::{AudioProcessor, ProcessContext};
pub use shaper::{shape, shape_buffer, MAX_HARDNESS, SATURATION_CEILING};
