//! Attack-decay-sustain-release envelope.

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};

/// Four-phase amplitude envelope.
///
/// Rises to 1 over `attack`, decays to `sustain` over `decay`, holds, and —
/// when `dur > 0` — releases to 0 over the last `release` seconds so it
/// reaches 0 exactly at `dur`, with one trigger pulse at the sample where
/// `dur` is first exceeded. A deferred server stop launches the release from
/// the current level instead, mirroring [`Fader`](crate::Fader).
pub struct Adsr {
    attack: f32,
    decay: f32,
    sustain: f32,
    release: f32,
    dur: f32,
    current_time: f32,
    dt: f32,
    releasing: bool,
    release_start: f32,
    release_level: f32,
    fired: bool,
    post: PostFx,
}

impl Adsr {
    /// Creates an ADSR envelope. Times are in seconds, `sustain` in `[0, 1]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &EngineConfig,
        attack: f32,
        decay: f32,
        sustain: f32,
        release: f32,
        dur: f32,
    ) -> Self {
        Self {
            attack: attack.max(0.0),
            decay: decay.max(0.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.max(0.0),
            dur: dur.max(0.0),
            current_time: 0.0,
            dt: 1.0 / config.sample_rate,
            releasing: false,
            release_start: 0.0,
            release_level: 0.0,
            fired: false,
            post: PostFx::new(),
        }
    }

    fn shape_at(&self, t: f32) -> f32 {
        let held = if self.attack > 0.0 && t < self.attack {
            t / self.attack
        } else if self.decay > 0.0 && t < self.attack + self.decay {
            let frac = (t - self.attack) / self.decay;
            1.0 + (self.sustain - 1.0) * frac
        } else {
            self.sustain
        };
        if self.dur > 0.0 {
            if t >= self.dur {
                return 0.0;
            }
            if self.release > 0.0 && t > self.dur - self.release {
                return held.min(self.sustain * (self.dur - t) / self.release);
            }
        }
        held
    }
}

impl Node for Adsr {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], trig: &mut [f32]) {
        for (i, x) in out.iter_mut().enumerate() {
            let t = self.current_time;
            let level = if self.releasing {
                let elapsed = t - self.release_start;
                if self.release > 0.0 && elapsed < self.release {
                    self.release_level * (1.0 - elapsed / self.release)
                } else {
                    0.0
                }
            } else {
                if self.dur > 0.0 && t >= self.dur && !self.fired {
                    self.fired = true;
                    trig[i] = 1.0;
                }
                self.shape_at(t)
            };
            *x = level;
            self.current_time += self.dt;
        }
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.dt = 1.0 / config.sample_rate;
    }

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("attack", [v]) => {
                self.attack = v.max(0.0);
                Ok(())
            }
            ("decay", [v]) => {
                self.decay = v.max(0.0);
                Ok(())
            }
            ("sustain", [v]) => {
                self.sustain = v.clamp(0.0, 1.0);
                Ok(())
            }
            ("release", [v]) => {
                self.release = v.max(0.0);
                Ok(())
            }
            ("dur", [v]) => {
                self.dur = v.max(0.0);
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
            ("attack" | "decay" | "sustain" | "release" | "dur" | "mul" | "add", _) => {
                Err(AttrError::Arity {
                    expected: 1,
                    got: values.len(),
                })
            }
            _ => Err(AttrError::Unknown),
        }
    }

    fn on_play(&mut self) {
        self.current_time = 0.0;
        self.releasing = false;
        self.fired = false;
    }

    fn on_stop(&mut self) {
        if !self.releasing {
            self.release_level = self.shape_at(self.current_time);
            self.release_start = self.current_time;
            self.releasing = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caudal_core::{EngineConfig, Server};

    #[test]
    fn phases_reach_expected_levels() {
        let cfg = EngineConfig::new(48000.0, 48, 2);
        let mut srv = Server::new(cfg);
        // attack 10 ms, decay 20 ms, sustain 0.6, release 10 ms, dur 100 ms.
        let id = srv.register(Box::new(Adsr::new(&cfg, 0.01, 0.02, 0.6, 0.01, 0.1)));
        srv.play(id, 0.0, 0.0).unwrap();

        let mut samples = Vec::new();
        for _ in 0..120 {
            srv.tick();
            samples.extend_from_slice(srv.stream(id).unwrap().data());
        }

        let at = |sec: f32| samples[(sec * 48000.0) as usize];
        // Mid-attack.
        assert!((at(0.005) - 0.5).abs() < 1e-3);
        // Peak at the attack/decay boundary.
        assert!((at(0.01) - 1.0).abs() < 1e-3);
        // Mid-decay halfway between 1.0 and sustain.
        assert!((at(0.02) - 0.8).abs() < 1e-3);
        // Sustain plateau.
        assert!((at(0.06) - 0.6).abs() < 1e-4);
        // Mid-release (t = 95 ms, halfway down from sustain).
        assert!((at(0.095) - 0.3).abs() < 1e-3);
        // Done.
        assert_eq!(at(0.11), 0.0);
    }

    #[test]
    fn single_completion_pulse() {
        let cfg = EngineConfig::new(48000.0, 48, 2);
        let mut srv = Server::new(cfg);
        let id = srv.register(Box::new(Adsr::new(&cfg, 0.001, 0.001, 0.5, 0.001, 0.01)));
        srv.play(id, 0.0, 0.0).unwrap();
        let mut pulses = 0.0;
        for _ in 0..100 {
            srv.tick();
            pulses += srv
                .stream(id)
                .unwrap()
                .trigger()
                .data()
                .iter()
                .sum::<f32>();
        }
        assert_eq!(pulses, 1.0);
    }

    #[test]
    fn deferred_stop_releases_from_current_level() {
        let cfg = EngineConfig::new(48000.0, 48, 2);
        let mut srv = Server::new(cfg);
        let id = srv.register(Box::new(Adsr::new(&cfg, 0.001, 0.001, 0.5, 0.01, 0.0)));
        srv.play(id, 0.0, 0.0).unwrap();
        for _ in 0..50 {
            srv.tick();
        }
        assert_eq!(srv.stream(id).unwrap().data()[0], 0.5);
        srv.stop(id, 0.02).unwrap();
        for _ in 0..15 {
            srv.tick();
        }
        assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.0));
    }
}
