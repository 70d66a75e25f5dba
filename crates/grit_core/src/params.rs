//! Parameter Bridge
//!
//! Hands control values from the control thread to the audio thread.
//!
//! Each parameter is one `AtomicU32` holding `f32` bits. Writes clamp and
//! store; the audio thread loads all four once per block into a
//! [`ParameterSnapshot`]. There is no lock and no group atomicity: a gesture
//! that moves two knobs may land across two blocks, which only shifts when
//! it becomes audible.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use grit_dsp::DspError;

use crate::error::GritResult;

/// The four control parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamId {
    /// Input boost and curve hardness (normalized)
    Drive,
    /// Output trim compensating the drive boost (normalized)
    Range,
    /// Dry/wet mix, 0 = dry, 1 = wet
    Blend,
    /// Final linear output gain
    Volume,
}

impl ParamId {
    pub const ALL: [ParamId; 4] = [ParamId::Drive, ParamId::Range, ParamId::Blend, ParamId::Volume];

    /// Declared (min, max) range
    pub fn range(self) -> (f32, f32) {
        match self {
            ParamId::Drive | ParamId::Range | ParamId::Blend => (0.0, 1.0),
            ParamId::Volume => (0.0, 3.0),
        }
    }

    pub fn default_value(self) -> f32 {
        match self {
            ParamId::Drive | ParamId::Range | ParamId::Blend => 0.5,
            ParamId::Volume => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParamId::Drive => "drive",
            ParamId::Range => "range",
            ParamId::Blend => "blend",
            ParamId::Volume => "volume",
        }
    }

    /// Clamp a value into the declared range
    ///
    /// Non-finite values fall back to the default.
    pub fn clamp(self, value: f32) -> f32 {
        if !value.is_finite() {
            return self.default_value();
        }
        let (min, max) = self.range();
        value.clamp(min, max)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = DspError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ParamId::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| DspError::UnknownParameter(s.to_string()))
    }
}

/// All parameter values for one block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub drive: f32,
    pub range: f32,
    pub blend: f32,
    pub volume: f32,
}

impl ParameterSnapshot {
    pub fn get(&self, id: ParamId) -> f32 {
        match id {
            ParamId::Drive => self.drive,
            ParamId::Range => self.range,
            ParamId::Blend => self.blend,
            ParamId::Volume => self.volume,
        }
    }
}

impl Default for ParameterSnapshot {
    fn default() -> Self {
        Self {
            drive: ParamId::Drive.default_value(),
            range: ParamId::Range.default_value(),
            blend: ParamId::Blend.default_value(),
            volume: ParamId::Volume.default_value(),
        }
    }
}

/// Lock-free store of the current parameter values
///
/// Shared between threads behind an `Arc`.
pub struct ParameterBridge {
    /// Values stored as f32 bits, indexed by `ParamId`
    /// Rust pattern: AtomicF32 doesn't exist, so we use bit-casting
    values: [AtomicU32; 4],
}

impl ParameterBridge {
    /// Create a bridge holding every parameter's default
    pub fn new() -> Self {
        Self {
            values: ParamId::ALL.map(|id| AtomicU32::new(id.default_value().to_bits())),
        }
    }

    /// Set a parameter from the control thread
    ///
    /// Out-of-range values are clamped; never blocks, never allocates.
    #[inline]
    pub fn write(&self, id: ParamId, value: f32) {
        // Relaxed ordering is fine: each value is independent and
        // carries no other memory with it
        self.values[id.index()].store(id.clamp(value).to_bits(), Ordering::Relaxed);
    }

    /// Read a single parameter
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Relaxed))
    }

    /// Read all parameters, once per block on the audio thread
    ///
    /// # Real-time Safety
    /// Four atomic loads, no waiting.
    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            drive: self.get(ParamId::Drive),
            range: self.get(ParamId::Range),
            blend: self.get(ParamId::Blend),
            volume: self.get(ParamId::Volume),
        }
    }

    pub fn reset_to_defaults(&self) {
        for id in ParamId::ALL {
            self.write(id, id.default_value());
        }
    }

    /// Capture the current values for persistence
    pub fn state(&self) -> ParameterState {
        let mut state = ParameterState::default();
        for id in ParamId::ALL {
            state.set(id, self.get(id));
        }
        state
    }

    /// Restore values from persisted state
    ///
    /// Unknown ids are skipped, missing ids keep their current value.
    pub fn apply_state(&self, state: &ParameterState) {
        for (name, &value) in &state.values {
            match name.parse::<ParamId>() {
                Ok(id) => self.write(id, value),
                Err(e) => warn!("Ignoring stored parameter: {}", e),
            }
        }
        debug!("Applied parameter state: {:?}", self.snapshot());
    }
}

impl Default for ParameterBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Persisted parameter values as flat (id, value) pairs
///
/// Keys are kept as strings so that state written by a build with more or
/// fewer parameters still loads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterState {
    values: BTreeMap<String, f32>,
}

impl ParameterState {
    pub fn set(&mut self, id: ParamId, value: f32) {
        self.values.insert(id.name().to_string(), value);
    }

    pub fn get(&self, id: ParamId) -> Option<f32> {
        self.values.get(id.name()).copied()
    }

    /// Iterate over the stored (id, value) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.values.iter().map(|(name, &value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Serialize to a byte blob for the host
    pub fn to_bytes(&self) -> GritResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserialize from a byte blob produced by [`ParameterState::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> GritResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
