//! Uniform post-processing affine engine.
//!
//! Every node's raw output is passed through `mul * x + add` immediately
//! after its primary kernel. Both operands are [`Param`]s, so each is a
//! scalar or a per-sample stream; the cross product of binding variants,
//! together with the reversed forms needed for streaming subtraction and
//! division, gives nine specialized kernels. Kernel selection happens only
//! when an operand is rebound — the sample loop itself never tests a
//! variant.
//!
//! Constant subtraction and division fold at bind time (negated offset,
//! reciprocal scale). Streaming subtraction keeps the subtrahend as a
//! stream and selects a `mul*x - sub[i]` kernel; streaming division clamps
//! the divisor once per sample to magnitude >= [`DIV_EPSILON`], preserving
//! its sign, so the loop divides unconditionally and can never hit zero.
//!
//! When `mul` is the constant 1 and `add` the constant 0, an identity
//! fast path leaves the buffer untouched — important both for speed and
//! because even `x * 1.0 + 0.0` would rewrite `-0.0` samples.

use crate::binding::Param;
use crate::math::{DIV_EPSILON, clamp_magnitude};
use crate::server::Tick;

type Kernel = fn(&PostFx, &Tick<'_>, &mut [f32]);

/// Post-processing affine stage: `out[i] = mul(i) * out[i] + add(i)`.
///
/// Defaults to the identity (`mul = 1`, `add = 0`).
pub struct PostFx {
    mul: Param,
    add: Param,
    /// Streaming `mul` operand is a divisor (`set_div` with a stream).
    div_mode: bool,
    /// Streaming `add` operand is a subtrahend (`set_sub` with a stream).
    sub_mode: bool,
    kernel: Kernel,
}

impl PostFx {
    /// Creates an identity post-processing stage.
    pub fn new() -> Self {
        let mut post = Self {
            mul: Param::Constant(1.0),
            add: Param::Constant(0.0),
            div_mode: false,
            sub_mode: false,
            kernel: Self::k_noscale,
        };
        post.select_kernel();
        post
    }

    /// Current `mul` operand.
    pub fn mul(&self) -> Param {
        self.mul
    }

    /// Current `add` operand.
    pub fn add(&self) -> Param {
        self.add
    }

    /// Binds the multiplier.
    pub fn set_mul(&mut self, mul: Param) {
        self.mul = mul;
        self.div_mode = false;
        self.select_kernel();
    }

    /// Binds the offset.
    pub fn set_add(&mut self, add: Param) {
        self.add = add;
        self.sub_mode = false;
        self.select_kernel();
    }

    /// Binds a subtrahend: output becomes `mul * x - sub`.
    ///
    /// A constant folds into a negated offset; a stream selects one of the
    /// reverse-subtract kernels.
    pub fn set_sub(&mut self, sub: Param) {
        match sub {
            Param::Constant(c) => {
                self.add = Param::Constant(-c);
                self.sub_mode = false;
            }
            Param::Stream(id) => {
                self.add = Param::Stream(id);
                self.sub_mode = true;
            }
        }
        self.select_kernel();
    }

    /// Binds a divisor: output becomes `x / div + add`.
    ///
    /// A constant folds into a reciprocal multiplier (clamped away from
    /// zero); a stream selects one of the reverse-divide kernels, which
    /// clamp per sample.
    pub fn set_div(&mut self, div: Param) {
        match div {
            Param::Constant(c) => {
                self.mul = Param::Constant(1.0 / clamp_magnitude(c, DIV_EPSILON));
                self.div_mode = false;
            }
            Param::Stream(id) => {
                self.mul = Param::Stream(id);
                self.div_mode = true;
            }
        }
        self.select_kernel();
    }

    /// Applies the selected kernel in place.
    #[inline]
    pub fn apply(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        (self.kernel)(self, tick, buf);
    }

    /// Re-selects the kernel from the current binding variants.
    ///
    /// Idempotent; this is the only place the nine variants branch.
    fn select_kernel(&mut self) {
        let mul_stream = self.mul.is_stream();
        let add_stream = self.add.is_stream();
        self.kernel = match (mul_stream, self.div_mode, add_stream, self.sub_mode) {
            (false, _, false, _) => {
                if self.mul.constant() == 1.0 && self.add.constant() == 0.0 {
                    Self::k_noscale
                } else {
                    Self::k_ii
                }
            }
            (true, false, false, _) => Self::k_ai,
            (false, _, true, false) => Self::k_ia,
            (true, false, true, false) => Self::k_aa,
            (false, _, true, true) => Self::k_rev_sub_i,
            (true, false, true, true) => Self::k_rev_sub_a,
            (true, true, false, _) => Self::k_rev_div_i,
            (true, true, true, false) => Self::k_rev_div_a,
            (true, true, true, true) => Self::k_rev_div_sub,
        };
    }

    // --- Kernels ---
    // Naming: i = constant operand, a = audio-rate (streaming) operand,
    // in mul-then-add position; rev_* are the reversed sub/div forms.

    fn k_noscale(&self, _tick: &Tick<'_>, _buf: &mut [f32]) {}

    fn k_ii(&self, _tick: &Tick<'_>, buf: &mut [f32]) {
        let m = self.mul.constant();
        let a = self.add.constant();
        for x in buf {
            *x = m * *x + a;
        }
    }

    fn k_ai(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let m = tick.stream_param(&self.mul);
        let a = self.add.constant();
        for (x, &mi) in buf.iter_mut().zip(m) {
            *x = mi * *x + a;
        }
    }

    fn k_ia(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let m = self.mul.constant();
        let a = tick.stream_param(&self.add);
        for (x, &ai) in buf.iter_mut().zip(a) {
            *x = m * *x + ai;
        }
    }

    fn k_aa(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let m = tick.stream_param(&self.mul);
        let a = tick.stream_param(&self.add);
        for ((x, &mi), &ai) in buf.iter_mut().zip(m).zip(a) {
            *x = mi * *x + ai;
        }
    }

    fn k_rev_sub_i(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let m = self.mul.constant();
        let s = tick.stream_param(&self.add);
        for (x, &si) in buf.iter_mut().zip(s) {
            *x = m * *x - si;
        }
    }

    fn k_rev_sub_a(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let m = tick.stream_param(&self.mul);
        let s = tick.stream_param(&self.add);
        for ((x, &mi), &si) in buf.iter_mut().zip(m).zip(s) {
            *x = mi * *x - si;
        }
    }

    fn k_rev_div_i(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let d = tick.stream_param(&self.mul);
        let a = self.add.constant();
        for (x, &di) in buf.iter_mut().zip(d) {
            *x = *x / clamp_magnitude(di, DIV_EPSILON) + a;
        }
    }

    fn k_rev_div_a(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let d = tick.stream_param(&self.mul);
        let a = tick.stream_param(&self.add);
        for ((x, &di), &ai) in buf.iter_mut().zip(d).zip(a) {
            *x = *x / clamp_magnitude(di, DIV_EPSILON) + ai;
        }
    }

    fn k_rev_div_sub(&self, tick: &Tick<'_>, buf: &mut [f32]) {
        let d = tick.stream_param(&self.mul);
        let s = tick.stream_param(&self.add);
        for ((x, &di), &si) in buf.iter_mut().zip(d).zip(s) {
            *x = *x / clamp_magnitude(di, DIV_EPSILON) - si;
        }
    }
}

impl Default for PostFx {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for PostFx {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PostFx")
            .field("mul", &self.mul)
            .field("add", &self.add)
            .field("div_mode", &self.div_mode)
            .field("sub_mode", &self.sub_mode)
            .finish_non_exhaustive()
    }
}
