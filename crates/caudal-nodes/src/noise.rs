//! White noise source.

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Uniform white noise in `[-1, 1)`.
///
/// Deterministic per seed, so two `Noise` nodes created with the same seed
/// produce identical sample streams.
pub struct Noise {
    rng: SmallRng,
    post: PostFx,
}

impl Noise {
    /// Creates a noise source with a fixed default seed.
    pub fn new() -> Self {
        Self::with_seed(0x5eed_cada)
    }

    /// Creates a noise source seeded explicitly.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            post: PostFx::new(),
        }
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for Noise {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        for x in out {
            *x = self.rng.gen_range(-1.0..1.0);
        }
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
            ("mul", [v]) => {
                self.post.set_mul((*v).into());
                Ok(())
            }
            ("add", [v]) => {
                self.post.set_add((*v).into());
                Ok(())
            }
            ("mul" | "add", _) => Err(AttrError::Arity {
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
    fn stays_in_range() {
        let mut srv = Server::new(EngineConfig::new(48000.0, 256, 2));
        let id = srv.register(Box::new(Noise::new()));
        srv.play(id, 0.0, 0.0).unwrap();
        for _ in 0..16 {
            srv.tick();
            for &x in srv.stream(id).unwrap().data() {
                assert!((-1.0..1.0).contains(&x));
            }
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut srv = Server::new(EngineConfig::new(48000.0, 64, 2));
        let ia = srv.register(Box::new(Noise::with_seed(42)));
        let ib = srv.register(Box::new(Noise::with_seed(42)));
        srv.play(ia, 0.0, 0.0).unwrap();
        srv.play(ib, 0.0, 0.0).unwrap();
        srv.tick();
        assert_eq!(
            srv.stream(ia).unwrap().data(),
            srv.stream(ib).unwrap().data()
        );
    }
}
