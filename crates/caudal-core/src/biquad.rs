//! Second-order IIR sections for the filter banks.
//!
//! Direct Form II transposed biquad plus RBJ cookbook coefficient
//! constructors. The band-splitting nodes cascade these into 4th-order
//! Butterworth and Linkwitz-Riley stages; coefficients are recomputed on
//! the control path when a cutoff or Q changes, never per sample.

use core::f32::consts::PI;
use libm::{cosf, sinf};

/// Normalized biquad coefficients (`a0` divided out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    /// Feedforward.
    pub b0: f32,
    /// Feedforward, one sample back.
    pub b1: f32,
    /// Feedforward, two samples back.
    pub b2: f32,
    /// Feedback, one sample back.
    pub a1: f32,
    /// Feedback, two samples back.
    pub a2: f32,
}

impl BiquadCoeffs {
    /// Passthrough coefficients.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalize(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let inv = 1.0 / a0;
        Self {
            b0: b0 * inv,
            b1: b1 * inv,
            b2: b2 * inv,
            a1: a1 * inv,
            a2: a2 * inv,
        }
    }

    /// RBJ lowpass (use Q = 0.707 for a Butterworth section).
    pub fn lowpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let (sn, cs) = (sinf(omega), cosf(omega));
        let alpha = sn / (2.0 * q);
        Self::normalize(
            (1.0 - cs) * 0.5,
            1.0 - cs,
            (1.0 - cs) * 0.5,
            1.0 + alpha,
            -2.0 * cs,
            1.0 - alpha,
        )
    }

    /// RBJ highpass.
    pub fn highpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let (sn, cs) = (sinf(omega), cosf(omega));
        let alpha = sn / (2.0 * q);
        Self::normalize(
            (1.0 + cs) * 0.5,
            -(1.0 + cs),
            (1.0 + cs) * 0.5,
            1.0 + alpha,
            -2.0 * cs,
            1.0 - alpha,
        )
    }

    /// RBJ constant-0dB-peak bandpass.
    pub fn bandpass(freq: f32, q: f32, sample_rate: f32) -> Self {
        let omega = 2.0 * PI * freq / sample_rate;
        let (sn, cs) = (sinf(omega), cosf(omega));
        let alpha = sn / (2.0 * q);
        Self::normalize(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cs, 1.0 - alpha)
    }
}

/// Direct Form II transposed biquad section.
///
/// ```text
/// y[n] = b0*x[n] + z1
/// z1   = b1*x[n] - a1*y[n] + z2
/// z2   = b2*x[n] - a2*y[n]
/// ```
#[derive(Debug, Clone)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Creates a passthrough section.
    pub fn new() -> Self {
        Self::with_coeffs(BiquadCoeffs::IDENTITY)
    }

    /// Creates a section with the given coefficients.
    pub fn with_coeffs(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Replaces the coefficients, keeping the filter state.
    pub fn set_coeffs(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    /// Current coefficients.
    pub fn coeffs(&self) -> BiquadCoeffs {
        self.coeffs
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = self.coeffs;
        let output = c.b0 * input + self.z1;
        self.z1 = c.b1 * input - c.a1 * output + self.z2;
        self.z2 = c.b2 * input - c.a2 * output;
        output
    }

    /// Clears the filter state.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl Default for Biquad {
    fn default() -> Self {
        Self::new()
    }
}
