//! Floating point control for tracing threads.

/// Flush denormals to zero on the calling thread.
///
/// Deep paths drive throughput weights toward zero, and denormal arithmetic
/// is very slow on x86. Results only differ below `f32::MIN_POSITIVE`.
#[cfg(target_arch = "x86_64")]
#[allow(deprecated)]
pub fn enable_flush_to_zero() {
    use std::arch::x86_64::{_mm_getcsr, _mm_setcsr};

    const FLUSH_ZERO_ON: u32 = 0x8000;
    const DENORMALS_ZERO_ON: u32 = 0x0040;

    // SAFETY: SSE is always available on x86_64 and only MXCSR mode bits change
    unsafe {
        _mm_setcsr(_mm_getcsr() | FLUSH_ZERO_ON | DENORMALS_ZERO_ON);
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn enable_flush_to_zero() {}
