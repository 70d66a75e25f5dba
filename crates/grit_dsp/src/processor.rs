//! Audio Processor Trait
//!
//! Defines the interface the host side uses to drive real-time processors.

/// Context passed to processors containing stream metadata
///
/// Fixed for the duration of a prepared session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessContext {
    pub sample_rate: f32,
    pub channels: usize,
    pub max_block_size: usize,
}

impl ProcessContext {
    pub fn new(sample_rate: f32, channels: usize, max_block_size: usize) -> Self {
        Self {
            sample_rate,
            channels,
            max_block_size,
        }
    }

    /// Duration of one full block in milliseconds
    pub fn block_duration_ms(&self) -> f32 {
        self.max_block_size as f32 / self.sample_rate * 1000.0
    }
}

/// Trait for real-time audio processors
///
/// # Real-time Safety Contract
///
/// Implementors MUST follow these rules in `process()`:
/// - NO heap allocations (no Vec::push, no Box::new, no String)
/// - NO syscalls (no file I/O, no network, no mutex locks, no logging)
/// - NO unbounded loops
/// - O(n) time complexity where n = buffer size
///
/// Violating these rules causes audio dropouts ("glitches").
pub trait AudioProcessor: Send {
    /// Process audio buffer in-place
    ///
    /// Buffer format is interleaved: [L0, R0, L1, R1, ...]
    fn process(&mut self, buffer: &mut [f32], context: &ProcessContext);

    /// Reset internal state (envelopes, meters, etc.)
    fn reset(&mut self);

    /// Human-readable name for debugging/UI
    fn name(&self) -> &'static str;
}
