//! Message Types for Thread Communication
//!
//! Events flow from the meter timer -> control surface

use serde::{Deserialize, Serialize};

use crate::levels::LevelSnapshot;

/// Events delivered to the control surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Meter refresh, in dB clamped to the meter range
    LevelUpdate(LevelSnapshot),

    /// Meter timer is shutting down; no further events follow
    Stopped,
}
