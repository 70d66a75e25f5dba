//! Meter Bank
//!
//! The four display meters: input and output, left and right. The audio
//! thread feeds them sample by sample; the control thread reads a
//! [`LevelSnapshot`] whenever it redraws.

use serde::{Deserialize, Serialize};

use grit_dsp::LevelMeter;

use crate::config::MeterConfig;
use crate::error::GritResult;

/// Which of the four meters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterId {
    InputLeft,
    InputRight,
    OutputLeft,
    OutputRight,
}

/// Display levels in dB, clamped to the meter range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub input_left: f32,
    pub input_right: f32,
    pub output_left: f32,
    pub output_right: f32,
}

impl LevelSnapshot {
    /// All four meters at the same level
    pub fn uniform(db: f32) -> Self {
        Self {
            input_left: db,
            input_right: db,
            output_left: db,
            output_right: db,
        }
    }

    pub fn get(&self, meter: MeterId) -> f32 {
        match meter {
            MeterId::InputLeft => self.input_left,
            MeterId::InputRight => self.input_right,
            MeterId::OutputLeft => self.output_left,
            MeterId::OutputRight => self.output_right,
        }
    }
}

/// Input/output stereo meters shared between threads behind an `Arc`
pub struct MeterBank {
    input_left: LevelMeter,
    input_right: LevelMeter,
    output_left: LevelMeter,
    output_right: LevelMeter,
}

impl MeterBank {
    pub fn new(sample_rate: f32, config: &MeterConfig) -> GritResult<Self> {
        // Rust pattern: a closure keeps the four identical constructions in one place
        let meter = || {
            LevelMeter::with_ballistics(
                sample_rate,
                config.release_ms,
                config.floor_db,
                config.ceiling_db,
            )
        };

        Ok(Self {
            input_left: meter()?,
            input_right: meter()?,
            output_left: meter()?,
            output_right: meter()?,
        })
    }

    pub fn meter(&self, id: MeterId) -> &LevelMeter {
        match id {
            MeterId::InputLeft => &self.input_left,
            MeterId::InputRight => &self.input_right,
            MeterId::OutputLeft => &self.output_left,
            MeterId::OutputRight => &self.output_right,
        }
    }

    fn all(&self) -> [&LevelMeter; 4] {
        [
            &self.input_left,
            &self.input_right,
            &self.output_left,
            &self.output_right,
        ]
    }

    /// Feed the pre-processing (dry) sample of one channel
    #[inline]
    pub fn update_input(&self, channel: usize, sample: f32) {
        match channel {
            0 => self.input_left.update(sample),
            1 => self.input_right.update(sample),
            _ => {}
        }
    }

    /// Feed the post-processing (final output) sample of one channel
    #[inline]
    pub fn update_output(&self, channel: usize, sample: f32) {
        match channel {
            0 => self.output_left.update(sample),
            1 => self.output_right.update(sample),
            _ => {}
        }
    }

    /// Read all four levels from any thread
    pub fn snapshot(&self) -> LevelSnapshot {
        LevelSnapshot {
            input_left: self.input_left.current_level_db(),
            input_right: self.input_right.current_level_db(),
            output_left: self.output_left.current_level_db(),
            output_right: self.output_right.current_level_db(),
        }
    }

    /// Level every meter reports for silence
    pub fn floor_db(&self) -> f32 {
        self.input_left.floor_db()
    }

    pub fn set_sample_rate(&self, sample_rate: f32) -> GritResult<()> {
        for meter in self.all() {
            meter.set_sample_rate(sample_rate)?;
        }
        Ok(())
    }

    /// Drop every envelope to silence
    pub fn reset(&self) {
        for meter in self.all() {
            meter.reset();
        }
    }
}
