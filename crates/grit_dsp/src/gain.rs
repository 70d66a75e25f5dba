//! Gain Stage
//!
//! Wraps the shaping curve in a pair of linear multipliers:
//! - input boost, driven by `drive`, pushes the signal into saturation
//! - output trim, driven by `range`, pulls the level back down
//!
//! ```text
//! boost_db  = drive * MAX_DRIVE_DB
//! curve_gain = shape(NOMINAL_LEVEL * boost, drive) / NOMINAL_LEVEL
//! trim       = curve_gain ^ -range
//! ```
//!
//! The trim is measured through the curve rather than taken from the boost,
//! since saturation already eats most of the boost on loud material. With
//! `range = 1.0` a signal at `NOMINAL_LEVEL` leaves at the level it came in
//! for every drive. With `range = 0.0` nothing is compensated.

use crate::shaper::shape;

/// Input boost at full drive, in dB
pub const MAX_DRIVE_DB: f32 = 36.0;

/// Reference amplitude (-6dBFS) the range compensation is measured at
pub const NOMINAL_LEVEL: f32 = 0.5;

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Per-block gain multipliers around the shaping curve
///
/// Computing this once per block keeps `powf` out of the per-sample loop.
/// Holds no signal state, so it can never introduce DC drift.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainStage {
    drive: f32,
    input_gain: f32,
    output_trim: f32,
}

impl GainStage {
    /// Build the multipliers for normalized `drive` and `range` (both 0.0 - 1.0)
    pub fn new(drive: f32, range: f32) -> Self {
        let drive = drive.clamp(0.0, 1.0);
        let range = range.clamp(0.0, 1.0);
        let input_gain = db_to_linear(drive * MAX_DRIVE_DB);
        let curve_gain = shape(NOMINAL_LEVEL * input_gain, drive) / NOMINAL_LEVEL;

        Self {
            drive,
            input_gain,
            output_trim: curve_gain.powf(-range),
        }
    }

    /// Linear input boost
    pub fn input_gain(&self) -> f32 {
        self.input_gain
    }

    /// Linear output trim
    pub fn output_trim(&self) -> f32 {
        self.output_trim
    }

    #[inline]
    pub fn boost(&self, sample: f32) -> f32 {
        sample * self.input_gain
    }

    #[inline]
    pub fn trim(&self, sample: f32) -> f32 {
        sample * self.output_trim
    }

    /// Boost, shape and trim a single sample, producing the wet signal
    ///
    /// # Real-time Safety
    /// No allocations, O(1) time.
    #[inline]
    pub fn apply(&self, sample: f32) -> f32 {
        self.trim(shape(self.boost(sample), self.drive))
    }
}

impl Default for GainStage {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}
