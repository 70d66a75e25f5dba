//! Chain and Meter Configuration

use serde::{Deserialize, Serialize};

use grit_dsp::{DEFAULT_CEILING_DB, DEFAULT_FLOOR_DB, DEFAULT_RELEASE_MS};

use crate::error::{GritError, GritResult};

/// Largest block the chain accepts
pub const MAX_BLOCK_SIZE: usize = 8192;

/// Meter ballistics and display refresh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Release time constant in milliseconds
    pub release_ms: f32,

    /// Level reported for silence
    pub floor_db: f32,

    /// Highest level reported
    pub ceiling_db: f32,

    /// How often the control thread polls the meters (Hz)
    pub refresh_hz: u32,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            release_ms: DEFAULT_RELEASE_MS,
            floor_db: DEFAULT_FLOOR_DB,
            ceiling_db: DEFAULT_CEILING_DB,
            refresh_hz: 30,
        }
    }
}

impl MeterConfig {
    /// Validate configuration
    pub fn validate(&self) -> GritResult<()> {
        if !(self.release_ms > 0.0 && self.release_ms.is_finite()) {
            return Err(GritError::ConfigError(format!(
                "Invalid meter release time: {}ms",
                self.release_ms
            )));
        }
        if !(self.floor_db < self.ceiling_db) {
            return Err(GritError::ConfigError(format!(
                "Meter floor {}dB must be below ceiling {}dB",
                self.floor_db, self.ceiling_db
            )));
        }
        if self.refresh_hz == 0 || self.refresh_hz > 240 {
            return Err(GritError::ConfigError(format!(
                "Invalid meter refresh rate: {}Hz",
                self.refresh_hz
            )));
        }
        Ok(())
    }
}

/// Overall chain configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: f32,

    /// Largest block the host will pass to `process`, in frames
    pub max_block_size: usize,

    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: usize,

    /// Meter settings
    #[serde(default)]
    pub meter: MeterConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            channels: 2,
            max_block_size: 512,
            meter: MeterConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Calculate latency in milliseconds of one full block
    pub fn latency_ms(&self) -> f32 {
        (self.max_block_size as f32 / self.sample_rate) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> GritResult<()> {
        if !(8000.0..=192_000.0).contains(&self.sample_rate) {
            return Err(GritError::ConfigError(format!(
                "Invalid sample rate: {}",
                self.sample_rate
            )));
        }
        if self.max_block_size == 0 || self.max_block_size > MAX_BLOCK_SIZE {
            return Err(GritError::InvalidBlockSize(self.max_block_size));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(GritError::UnsupportedChannels(self.channels));
        }
        self.meter.validate()
    }
}
