//! Hardware input channel tap.

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};

/// Exposes one deinterleaved hardware input channel as a stream.
///
/// Audio channels come first, then the analog/control channels the host
/// appended; the channel index addresses that combined layout. A channel
/// the host never fills reads as silence.
pub struct InputTap {
    channel: usize,
    post: PostFx,
}

impl InputTap {
    /// Taps input channel `channel`.
    pub fn new(channel: usize) -> Self {
        Self {
            channel,
            post: PostFx::new(),
        }
    }

    /// The tapped channel index.
    pub fn channel(&self) -> usize {
        self.channel
    }
}

impl Node for InputTap {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        out.copy_from_slice(tick.input_channel(self.channel));
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, _config: &EngineConfig) {}

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("channel", [v]) => {
                self.channel = *v as usize;
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
            ("channel" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }
}
