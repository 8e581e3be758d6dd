//! Constant-vs-stream parameter bindings.
//!
//! Every tunable node input is a [`Param`]: either a fixed scalar or a
//! reference to another node's output stream. Which variant a parameter is
//! bound to is decided on the control path, at bind time; the decision
//! selects a specialized processing kernel so the per-sample hot loop never
//! tests the variant. Rebinding is cheap and idempotent — it swaps a value
//! and re-runs kernel selection, nothing more.
//!
//! The convention throughout the node library:
//!
//! ```rust,ignore
//! pub fn set_freq(&mut self, freq: Param) {
//!     self.freq = freq;
//!     self.select_kernel(); // the only place binding variants branch
//! }
//! ```
//!
//! Kernels bound to a streaming parameter resolve it through
//! [`Tick::stream_param`](crate::Tick::stream_param) once per tick and then
//! iterate the slice; kernels bound to a constant read
//! [`Param::constant`] once and never touch the registry.

use crate::stream::StreamId;

/// A node input: fixed scalar or reference to a producer stream.
///
/// Stream references are non-owning. Feedback topologies are realized with
/// node-internal delay lines, never by binding a node to its own output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    /// Fixed scalar value.
    Constant(f32),
    /// Per-sample values read from another node's output stream.
    Stream(StreamId),
}

impl Param {
    /// True if this parameter is bound to a stream.
    #[inline]
    pub fn is_stream(&self) -> bool {
        matches!(self, Param::Stream(_))
    }

    /// The constant value, or 0.0 for a stream binding.
    ///
    /// Only meaningful inside kernels selected for the constant variant.
    #[inline]
    pub fn constant(&self) -> f32 {
        match self {
            Param::Constant(v) => *v,
            Param::Stream(_) => 0.0,
        }
    }

    /// The bound stream id, if any.
    #[inline]
    pub fn stream_id(&self) -> Option<StreamId> {
        match self {
            Param::Constant(_) => None,
            Param::Stream(id) => Some(*id),
        }
    }
}

impl From<f32> for Param {
    fn from(v: f32) -> Self {
        Param::Constant(v)
    }
}

impl From<StreamId> for Param {
    fn from(id: StreamId) -> Self {
        Param::Stream(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants() {
        let c = Param::from(2.5);
        assert!(!c.is_stream());
        assert_eq!(c.constant(), 2.5);
        assert_eq!(c.stream_id(), None);

        let s = Param::Stream(StreamId(7));
        assert!(s.is_stream());
        assert_eq!(s.constant(), 0.0);
        assert_eq!(s.stream_id(), Some(StreamId(7)));
    }
}
