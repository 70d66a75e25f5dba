//! Grit Core - Distortion Engine
//!
//! This crate provides the real-time side of the Grit distortion, including:
//! - The signal chain (gain → shape → blend → volume) and its lifecycle
//! - A lock-free parameter bridge from the control thread
//! - Input/output stereo meters readable from any thread
//! - A display timer that turns meter readings into events
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Control Thread                         │
//! │  knobs ──write()──▶ ParameterBridge      MeterTimer ──▶ UI  │
//! └─────────────────────────────────────────────────────────────┘
//!                  │ AtomicU32 x4               ▲ AtomicU32 x4
//!                  ▼                            │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Audio Thread                          │
//! │   snapshot() ─▶ SignalChain::process() ─▶ MeterBank         │
//! │              (Zero allocation, zero locks in this path)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod chain;
mod config;
mod error;
mod levels;
mod message;
mod params;
mod timer;

pub use chain::SignalChain;
pub use config::{ChainConfig, MeterConfig, MAX_BLOCK_SIZE};
pub use error::{GritError, GritResult};
pub use levels::{LevelSnapshot, MeterBank, MeterId};
pub use message::Event;
pub use params::{ParamId, ParameterBridge, ParameterSnapshot, ParameterState};
pub use timer::MeterTimer;

// Re-export DSP types for convenience
pub use grit_dsp::{AudioProcessor, ProcessContext};
