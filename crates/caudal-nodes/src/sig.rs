//! Constant-valued signal source.

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};

/// Emits a control-path-settable constant as a stream.
///
/// The canonical way to turn a scalar into a streaming operand: register a
/// `Sig`, bind another node's `mul` or `add` to its stream, and drive the
/// value from the control path with `set_value`.
pub struct Sig {
    value: f32,
    post: PostFx,
}

impl Sig {
    /// Creates a source holding `value`.
    pub fn new(value: f32) -> Self {
        Self {
            value,
            post: PostFx::new(),
        }
    }

    /// Current value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Sets the value emitted from the next tick on.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
    }
}

impl Node for Sig {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        out.fill(self.value);
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
            ("value", [v]) => {
                self.value = *v;
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
            ("value" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caudal_core::{EngineConfig, Server};

    #[test]
    fn emits_constant_block() {
        let mut srv = Server::new(EngineConfig::new(48000.0, 8, 2));
        let id = srv.register(Box::new(Sig::new(0.25)));
        srv.play(id, 0.0, 0.0).unwrap();
        srv.tick();
        assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.25));
    }

    #[test]
    fn value_attribute() {
        let mut srv = Server::new(EngineConfig::new(48000.0, 8, 2));
        let id = srv.register_named("amp", Box::new(Sig::new(0.0)));
        srv.play(id, 0.0, 0.0).unwrap();
        srv.set_value("amp", &[0.7]).unwrap();
        srv.tick();
        assert_eq!(srv.stream(id).unwrap().data()[0], 0.7);
    }
}
