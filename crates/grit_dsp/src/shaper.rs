//! Shaping Curve
//!
//! The saturating transfer function at the heart of the distortion.
//!
//! # Algorithm
//!
//! Uses a normalized tanh curve:
//!
//! ```text
//! shape(x, drive) = tanh(k * x) / tanh(k)
//! k               = 1 + drive * (MAX_HARDNESS - 1)
//! ```
//!
//! - `drive = 0.0`: gentle curve (k = 1), nearly linear around zero
//! - `drive = 1.0`: hard knee (k = 10), close to a clipper
//!
//! The curve is odd, monotonic and passes through (1, 1) for every drive,
//! so full-scale input always maps to full-scale output. The magnitude is
//! bounded by `1 / tanh(k)`, which is largest at k = 1.

/// Curve hardness at full drive
pub const MAX_HARDNESS: f32 = 10.0;

/// Upper bound of `|shape(x, drive)|` for any input and any drive in [0, 1]
///
/// Equal to `1 / tanh(1)`.
pub const SATURATION_CEILING: f32 = 1.313_035_3;

/// Map a normalized drive amount to curve hardness
#[inline]
fn hardness(drive: f32) -> f32 {
    1.0 + drive.clamp(0.0, 1.0) * (MAX_HARDNESS - 1.0)
}

/// Distort a single sample
///
/// Pure and stateless: safe to call from any number of channels at once.
/// Continuous in `drive`, so automating drive does not click.
///
/// # Real-time Safety
/// No allocations, O(1) time.
#[inline]
pub fn shape(sample: f32, drive: f32) -> f32 {
    let k = hardness(drive);
    // tanh saturates to exactly ±1.0 in f32 long before k * sample overflows,
    // so the output stays finite for any finite input
    (k * sample).tanh() / k.tanh()
}

/// Distort a buffer in-place
#[inline]
pub fn shape_buffer(buffer: &mut [f32], drive: f32) {
    let k = hardness(drive);
    let norm = 1.0 / k.tanh();
    for sample in buffer.iter_mut() {
        *sample = (k * *sample).tanh() * norm;
    }
}
