//! Control-rate parameter resolution shared by the larger nodes.
//!
//! Audio-rate inputs are resolved to buffer slices through
//! [`Tick::stream_param`](caudal_core::Tick::stream_param) inside selected
//! kernels. Slow-moving tunables (feedback, cutoff, balance) instead sample
//! their binding once per tick: a constant reads the scalar, a stream reads
//! the first sample of the producer's block. Either way the per-sample loop
//! sees a plain `f32`.

use caudal_core::{Param, Tick};

/// Resolves a control-rate parameter to one value for this tick.
#[inline]
pub(crate) fn control(tick: &Tick<'_>, param: &Param) -> f32 {
    match param {
        Param::Constant(c) => *c,
        Param::Stream(id) => tick.stream(*id).first().copied().unwrap_or(0.0),
    }
}
