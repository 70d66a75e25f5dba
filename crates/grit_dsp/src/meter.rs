//! Level Meter
//!
//! Peak envelope follower for display metering.
//!
//! # Ballistics
//!
//! - Attack: instant. A sample louder than the envelope replaces it, so
//!   transients are never under-reported.
//! - Release: exponential decay toward the current magnitude with a fixed
//!   time constant, so the reading is readable rather than flickering.
//!
//! # Threading
//!
//! The envelope lives in a single `AtomicU32` holding `f32` bits.
//! `update()` is called by exactly one writer (the audio thread);
//! `current_level_db()` may be called from any thread at any time and
//! always observes a whole value, possibly a few samples old.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::DspError;

/// Default release time constant in milliseconds
pub const DEFAULT_RELEASE_MS: f32 = 300.0;

/// Default display floor; silence reads as this value
pub const DEFAULT_FLOOR_DB: f32 = -60.0;

/// Default display ceiling
pub const DEFAULT_CEILING_DB: f32 = 6.0;

/// Fast-attack, slow-release envelope with a lock-free dB readout
pub struct LevelMeter {
    /// Current envelope (linear magnitude), stored as f32 bits
    envelope_bits: AtomicU32,
    /// Per-sample release multiplier, stored as f32 bits
    release_bits: AtomicU32,
    release_ms: f32,
    floor_db: f32,
    ceiling_db: f32,
}

impl LevelMeter {
    /// Create a meter for the given sample rate with default ballistics
    pub fn new(sample_rate: f32) -> Self {
        Self {
            envelope_bits: AtomicU32::new(0.0_f32.to_bits()),
            release_bits: AtomicU32::new(
                release_coefficient(DEFAULT_RELEASE_MS, sample_rate).to_bits(),
            ),
            release_ms: DEFAULT_RELEASE_MS,
            floor_db: DEFAULT_FLOOR_DB,
            ceiling_db: DEFAULT_CEILING_DB,
        }
    }

    /// Create a meter with custom release time and display range
    pub fn with_ballistics(
        sample_rate: f32,
        release_ms: f32,
        floor_db: f32,
        ceiling_db: f32,
    ) -> Result<Self, DspError> {
        validate_sample_rate(sample_rate)?;
        if !(release_ms > 0.0 && release_ms.is_finite()) {
            return Err(DspError::InvalidReleaseTime(release_ms));
        }
        // Rust pattern: `!(a < b)` also rejects NaN, which `a >= b` would let through
        if !(floor_db < ceiling_db) {
            return Err(DspError::InvalidMeterRange {
                floor: floor_db,
                ceiling: ceiling_db,
            });
        }

        Ok(Self {
            envelope_bits: AtomicU32::new(0.0_f32.to_bits()),
            release_bits: AtomicU32::new(
                release_coefficient(release_ms, sample_rate).to_bits(),
            ),
            release_ms,
            floor_db,
            ceiling_db,
        })
    }

    /// Recompute the release coefficient for a new sample rate
    ///
    /// Only called while the audio thread is not updating this meter.
    pub fn set_sample_rate(&self, sample_rate: f32) -> Result<(), DspError> {
        validate_sample_rate(sample_rate)?;
        let coeff = release_coefficient(self.release_ms, sample_rate);
        self.release_bits.store(coeff.to_bits(), Ordering::Relaxed);
        Ok(())
    }

    /// Feed one sample into the envelope
    ///
    /// Single writer only. Non-finite samples are ignored.
    ///
    /// # Real-time Safety
    /// No allocations, no locks, O(1) time.
    #[inline]
    pub fn update(&self, sample: f32) {
        let magnitude = sample.abs();
        if !magnitude.is_finite() {
            return;
        }

        let envelope = f32::from_bits(self.envelope_bits.load(Ordering::Relaxed));
        let next = if magnitude > envelope {
            magnitude
        } else {
            let release = f32::from_bits(self.release_bits.load(Ordering::Relaxed));
            magnitude + (envelope - magnitude) * release
        };

        // Flush denormals so a long silence doesn't crawl through subnormal range
        let next = if next < 1.0e-20 { 0.0 } else { next };
        self.envelope_bits.store(next.to_bits(), Ordering::Relaxed);
    }

    /// Feed a whole buffer into the envelope
    #[inline]
    pub fn update_buffer(&self, buffer: &[f32]) {
        for &sample in buffer {
            self.update(sample);
        }
    }

    /// Current envelope as linear magnitude
    pub fn envelope(&self) -> f32 {
        f32::from_bits(self.envelope_bits.load(Ordering::Relaxed))
    }

    /// Current level in dB, clamped to the display range
    ///
    /// Silence reads as the floor, never negative infinity.
    pub fn current_level_db(&self) -> f32 {
        linear_to_db(self.envelope(), self.floor_db, self.ceiling_db)
    }

    /// Drop the envelope to silence
    pub fn reset(&self) {
        self.envelope_bits.store(0.0_f32.to_bits(), Ordering::Relaxed);
    }

    pub fn floor_db(&self) -> f32 {
        self.floor_db
    }

    pub fn ceiling_db(&self) -> f32 {
        self.ceiling_db
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

fn validate_sample_rate(sample_rate: f32) -> Result<(), DspError> {
    if sample_rate > 0.0 && sample_rate.is_finite() {
        Ok(())
    } else {
        Err(DspError::InvalidSampleRate(sample_rate))
    }
}

/// Per-sample multiplier that decays by 1/e over `release_ms`
fn release_coefficient(release_ms: f32, sample_rate: f32) -> f32 {
    let samples = (release_ms / 1000.0 * sample_rate).max(1.0);
    (-1.0 / samples).exp()
}

/// Convert a linear magnitude to dB within [floor, ceiling]
#[inline]
pub fn linear_to_db(linear: f32, floor_db: f32, ceiling_db: f32) -> f32 {
    if linear <= 0.0 {
        return floor_db;
    }
    (20.0 * linear.log10()).clamp(floor_db, ceiling_db)
}
