//! The DSP node contract.
//!
//! A [`Node`] produces one block of samples per tick into the stream it was
//! registered with. The server drives the contract: it advances the
//! stream's scheduler, calls [`Node::compute`] when the stream is active,
//! and applies the node's [`PostFx`] immediately afterwards — primary
//! kernel and post-processing are never reordered or separated.
//!
//! Nodes read their inputs through the [`Tick`](crate::Tick) view, which
//! resolves [`Param`](crate::Param) bindings to producer buffers. They must
//! not allocate in `compute`; anything that allocates (binding changes,
//! window resizes) belongs on the control path via `set_attribute` or
//! `configure`.

use crate::binding::Param;
use crate::config::EngineConfig;
use crate::postfx::PostFx;
use crate::server::Tick;

/// Error returned by [`Node::set_attribute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrError {
    /// The node has no attribute with the given name.
    Unknown,
    /// The attribute exists but the value slice has the wrong length.
    Arity {
        /// Number of values the attribute expects.
        expected: usize,
        /// Number of values received.
        got: usize,
    },
}

impl core::fmt::Display for AttrError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AttrError::Unknown => write!(f, "unknown attribute"),
            AttrError::Arity { expected, got } => {
                write!(f, "attribute expects {expected} value(s), got {got}")
            }
        }
    }
}

/// A DSP computation unit producing one stream per tick.
pub trait Node: Send {
    /// Computes one block of raw output samples.
    ///
    /// `out` is the stream's sample buffer (previous contents may be
    /// stale); `trig` is the stream's trigger buffer, already cleared this
    /// tick — write 1.0 at a sample index to fire a pulse. Runs only while
    /// the stream is active.
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], trig: &mut [f32]);

    /// The post-processing stage the server applies after `compute`.
    fn post(&self) -> &PostFx;

    /// Mutable access to the post-processing stage (control path).
    fn post_mut(&mut self) -> &mut PostFx;

    /// Reacts to an engine reconfiguration (sample rate or buffer size).
    ///
    /// Called between ticks only. Recompute coefficients and resize any
    /// internal lines here.
    fn configure(&mut self, config: &EngineConfig);

    /// Assigns a named scalar/vector attribute from the control path.
    ///
    /// The default implementation knows the universal `mul` and `add`
    /// attributes (constant rebinding of the post-processing operands) and
    /// rejects everything else.
    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        let one = |values: &[f32]| -> Result<f32, AttrError> {
            match values {
                [v] => Ok(*v),
                _ => Err(AttrError::Arity {
                    expected: 1,
                    got: values.len(),
                }),
            }
        };
        match key {
            "mul" => {
                let v = one(values)?;
                self.post_mut().set_mul(v.into());
                Ok(())
            }
            "add" => {
                let v = one(values)?;
                self.post_mut().set_add(v.into());
                Ok(())
            }
            _ => Err(AttrError::Unknown),
        }
    }

    /// Rebinds a named parameter to a constant or a stream.
    ///
    /// This is the explicit rebind operation of the dispatch mechanism: it
    /// must re-run kernel selection, be idempotent, and allocate nothing.
    /// The default implementation knows the universal `mul`/`add`/`sub`/
    /// `div` post-processing operands and rejects everything else.
    fn set_param(&mut self, key: &str, value: Param) -> Result<(), AttrError> {
        match key {
            "mul" => {
                self.post_mut().set_mul(value);
                Ok(())
            }
            "add" => {
                self.post_mut().set_add(value);
                Ok(())
            }
            "sub" => {
                self.post_mut().set_sub(value);
                Ok(())
            }
            "div" => {
                self.post_mut().set_div(value);
                Ok(())
            }
            _ => Err(AttrError::Unknown),
        }
    }

    /// Hook invoked on the tick where the stream becomes active.
    ///
    /// Envelope-style nodes reset their internal clock here.
    fn on_play(&mut self) {}

    /// Hook invoked when a deferred stop is requested.
    ///
    /// Fade-style nodes start their release curve here; the scheduler keeps
    /// the stream live for the stop-wait window.
    fn on_stop(&mut self) {}
}
