//! Dry/Wet Blend

/// Mix the unprocessed and processed signal
///
/// `blend = 0.0` returns `dry` and `blend = 1.0` returns `wet`, both
/// bit-for-bit. The interpolation alone cannot promise that, since
/// `dry * 1.0 + wet * 0.0` turns a NaN or infinite wet sample into NaN.
/// Values outside [0, 1] are clamped.
///
/// # Real-time Safety
/// No allocations, O(1) time.
#[inline]
pub fn mix(dry: f32, wet: f32, blend: f32) -> f32 {
    if blend <= 0.0 {
        dry
    } else if blend >= 1.0 {
        wet
    } else {
        dry * (1.0 - blend) + wet * blend
    }
}
