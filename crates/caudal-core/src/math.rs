//! Numeric helpers shared by the engine and the node library.
//!
//! Includes denormal flushing for feedback paths, the sign-preserving
//! magnitude clamp used by the reverse-divide post-processing kernels, and
//! the buffer-quantization conversions that turn seconds into whole ticks.

use crate::config::EngineConfig;

/// Smallest divisor magnitude accepted by the reverse-divide kernels.
///
/// A streaming divisor is clamped once per sample to at least this
/// magnitude, so the division itself can never hit zero.
pub const DIV_EPSILON: f32 = 1e-5;

/// Threshold below which filter state is flushed to exactly zero.
///
/// Denormal floats are orders of magnitude slower on most CPUs; feedback
/// structures (one-pole dampers, waveguide lines) flush their state instead
/// of letting it decay into the denormal range.
pub const DENORMAL_THRESHOLD: f32 = 1e-20;

/// Flushes denormal-range values to zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < DENORMAL_THRESHOLD { 0.0 } else { x }
}

/// Clamps `x` away from zero while preserving its sign.
///
/// Any value with `|x| < eps` is replaced by `eps` (or `-eps` for negative
/// input); exact zero maps to `+eps`. Values at or beyond the threshold pass
/// through unchanged.
#[inline]
pub fn clamp_magnitude(x: f32, eps: f32) -> f32 {
    if x >= 0.0 {
        if x < eps { eps } else { x }
    } else if x > -eps {
        -eps
    } else {
        x
    }
}

/// Converts a delay in seconds to whole ticks, rounding half away from zero.
///
/// Non-positive input (and anything rounding to zero) yields 0 ticks, which
/// callers treat as "activate immediately".
pub fn delay_ticks(seconds: f32, config: &EngineConfig) -> u32 {
    if seconds <= 0.0 {
        return 0;
    }
    let ticks = (seconds * config.sample_rate / config.buffer_size as f32).round();
    if ticks <= 0.0 { 0 } else { ticks as u32 }
}

/// Converts a duration (or stop wait) in seconds to whole ticks.
///
/// Uses the biased truncation `floor(x + 0.5)` so a duration that lands
/// exactly between two tick boundaries rounds up to the later one.
/// Non-positive input yields 0 ticks ("no countdown armed").
pub fn duration_ticks(seconds: f32, config: &EngineConfig) -> u32 {
    if seconds <= 0.0 {
        return 0;
    }
    let ticks = seconds * config.sample_rate / config.buffer_size as f32 + 0.5;
    if ticks <= 0.0 { 0 } else { ticks as u32 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> EngineConfig {
        EngineConfig::new(44100.0, 64, 2)
    }

    #[test]
    fn clamp_preserves_sign() {
        assert_eq!(clamp_magnitude(0.0, DIV_EPSILON), DIV_EPSILON);
        assert_eq!(clamp_magnitude(1e-7, DIV_EPSILON), DIV_EPSILON);
        assert_eq!(clamp_magnitude(-1e-7, DIV_EPSILON), -DIV_EPSILON);
        assert_eq!(clamp_magnitude(0.5, DIV_EPSILON), 0.5);
        assert_eq!(clamp_magnitude(-0.5, DIV_EPSILON), -0.5);
    }

    #[test]
    fn delay_quantization_rounds() {
        // 0.01 s at 44100/64 = 6.89 ticks -> 7
        assert_eq!(delay_ticks(0.01, &cfg()), 7);
        assert_eq!(delay_ticks(0.0, &cfg()), 0);
        assert_eq!(delay_ticks(-1.0, &cfg()), 0);
        // Exactly half a tick rounds away from zero.
        let half_tick = 32.0 / 44100.0;
        assert_eq!(delay_ticks(half_tick, &cfg()), 1);
    }

    #[test]
    fn duration_quantization_biased() {
        // 0.5 s at 44100/64 = 344.53 ticks, +0.5 bias -> 345
        assert_eq!(duration_ticks(0.5, &cfg()), 345);
        assert_eq!(duration_ticks(0.0, &cfg()), 0);
    }

    #[test]
    fn denormal_flush() {
        assert_eq!(flush_denormal(1e-25), 0.0);
        assert_eq!(flush_denormal(-1e-25), 0.0);
        assert_eq!(flush_denormal(1e-10), 1e-10);
    }
}
