//! One-pole lowpass for damping and prefiltering.
//!
//! The recursion is the classic leaky integrator:
//!
//! ```text
//! y[n] = (1 - c) * x[n] + c * y[n-1],  c = exp(-2π * freq / sample_rate)
//! ```
//!
//! 6 dB/octave, one multiply-add per sample. The reverb network uses one
//! per waveguide line for high-frequency damping and the pitch tracker uses
//! one to prefilter its analysis window. The coefficient is recomputed only
//! when the cutoff actually changes; callers can bang `set_frequency` every
//! block without paying for `exp`.

use crate::math::flush_denormal;
use libm::expf;

/// One-pole (6 dB/oct) lowpass filter.
#[derive(Debug, Clone)]
pub struct OnePole {
    state: f32,
    coeff: f32,
    freq: f32,
    sample_rate: f32,
}

impl OnePole {
    /// Creates a lowpass with the given cutoff.
    pub fn new(sample_rate: f32, freq_hz: f32) -> Self {
        let mut filter = Self {
            state: 0.0,
            coeff: 0.0,
            freq: freq_hz,
            sample_rate,
        };
        filter.recompute();
        filter
    }

    /// Sets the cutoff frequency, recomputing the coefficient only if the
    /// value changed.
    pub fn set_frequency(&mut self, freq_hz: f32) {
        if freq_hz != self.freq {
            self.freq = freq_hz;
            self.recompute();
        }
    }

    /// Current cutoff frequency in Hz.
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    /// Updates the sample rate and recomputes the coefficient.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        if sample_rate != self.sample_rate {
            self.sample_rate = sample_rate;
            self.recompute();
        }
    }

    /// Filters one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.state = flush_denormal((1.0 - self.coeff) * input + self.coeff * self.state);
        self.state
    }

    /// Clears the filter state.
    pub fn reset(&mut self) {
        self.state = 0.0;
    }

    fn recompute(&mut self) {
        self.coeff = expf(-core::f32::consts::TAU * self.freq / self.sample_rate);
    }
}
