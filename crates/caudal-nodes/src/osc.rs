//! Phase-accumulator sine oscillator.
//!
//! `freq` and `phase` are each constant-or-stream, giving four primary
//! kernels. Selection runs only when a binding changes; the sample loops
//! are branch-free.

use caudal_core::{AttrError, EngineConfig, Node, Param, PostFx, Tick};
use core::f32::consts::TAU;
use libm::sinf;

type SineKernel = fn(&mut Sine, &Tick<'_>, &mut [f32]);

/// Sine oscillator with constant-or-stream frequency and phase offset.
///
/// The accumulated phase lives in `[0, 1)` cycles; the `phase` parameter is
/// an additive offset in cycles.
pub struct Sine {
    freq: Param,
    phase_offset: Param,
    accum: f32,
    inv_sample_rate: f32,
    kernel: SineKernel,
    post: PostFx,
}

impl Sine {
    /// Creates an oscillator at the given sample rate.
    pub fn new(config: &EngineConfig, freq: Param, phase: Param) -> Self {
        let mut osc = Self {
            freq,
            phase_offset: phase,
            accum: 0.0,
            inv_sample_rate: 1.0 / config.sample_rate,
            kernel: Self::k_ii,
            post: PostFx::new(),
        };
        osc.select_kernel();
        osc
    }

    /// Rebinds the frequency parameter.
    pub fn set_freq(&mut self, freq: Param) {
        self.freq = freq;
        self.select_kernel();
    }

    /// Rebinds the phase-offset parameter.
    pub fn set_phase(&mut self, phase: Param) {
        self.phase_offset = phase;
        self.select_kernel();
    }

    fn select_kernel(&mut self) {
        self.kernel = match (self.freq.is_stream(), self.phase_offset.is_stream()) {
            (false, false) => Self::k_ii,
            (true, false) => Self::k_ai,
            (false, true) => Self::k_ia,
            (true, true) => Self::k_aa,
        };
    }

    #[inline]
    fn advance(&mut self, freq: f32) {
        self.accum += freq * self.inv_sample_rate;
        if self.accum >= 1.0 {
            self.accum -= 1.0;
        } else if self.accum < 0.0 {
            self.accum += 1.0;
        }
    }

    fn k_ii(&mut self, _tick: &Tick<'_>, out: &mut [f32]) {
        let freq = self.freq.constant();
        let offset = self.phase_offset.constant();
        for x in out {
            *x = sinf(TAU * (self.accum + offset));
            self.advance(freq);
        }
    }

    fn k_ai(&mut self, tick: &Tick<'_>, out: &mut [f32]) {
        let freq = tick.stream_param(&self.freq);
        let offset = self.phase_offset.constant();
        for (x, &f) in out.iter_mut().zip(freq) {
            *x = sinf(TAU * (self.accum + offset));
            self.advance(f);
        }
    }

    fn k_ia(&mut self, tick: &Tick<'_>, out: &mut [f32]) {
        let freq = self.freq.constant();
        let offset = tick.stream_param(&self.phase_offset);
        for (x, &p) in out.iter_mut().zip(offset) {
            *x = sinf(TAU * (self.accum + p));
            self.advance(freq);
        }
    }

    fn k_aa(&mut self, tick: &Tick<'_>, out: &mut [f32]) {
        let freq = tick.stream_param(&self.freq);
        let offset = tick.stream_param(&self.phase_offset);
        for ((x, &f), &p) in out.iter_mut().zip(freq).zip(offset) {
            *x = sinf(TAU * (self.accum + p));
            self.advance(f);
        }
    }
}

impl Node for Sine {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        // Kernel fn pointers need the receiver split from the call.
        let kernel = self.kernel;
        kernel(self, tick, out);
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.inv_sample_rate = 1.0 / config.sample_rate;
    }

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("freq", [v]) => {
                self.set_freq((*v).into());
                Ok(())
            }
            ("phase", [v]) => {
                self.set_phase((*v).into());
                Ok(())
            }
            ("mul", [v]) => {
                self.post.set_mul((*v).into());
                Ok(())
            }
            ("add", [v]) => {
                self.post.set_add((*v).into());
                Ok(())
            }
            ("freq" | "phase" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }

    fn set_param(&mut self, key: &str, value: Param) -> Result<(), AttrError> {
        match key {
            "freq" => {
                self.set_freq(value);
                Ok(())
            }
            "phase" => {
                self.set_phase(value);
                Ok(())
            }
            "mul" => {
                self.post.set_mul(value);
                Ok(())
            }
            "add" => {
                self.post.set_add(value);
                Ok(())
            }
            "sub" => {
                self.post.set_sub(value);
                Ok(())
            }
            "div" => {
                self.post.set_div(value);
                Ok(())
            }
            _ => Err(AttrError::Unknown),
        }
    }

    fn on_play(&mut self) {
        self.accum = 0.0;
    }
}
