//! Linear fade-in / sustain / fade-out envelope.

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};

/// Rise-sustain-fall amplitude envelope.
///
/// Rises linearly from 0 to 1 over `fadein` seconds, sustains at 1, and —
/// when `dur > 0` — falls linearly over the last `fadeout` seconds so it
/// reaches 0 exactly at `dur`. One trigger pulse fires at the sample where
/// `dur` is first exceeded. A deferred server stop (`stop(wait)`) launches
/// the fall immediately from the current level instead.
///
/// With `dur = 0` the envelope sustains until stopped.
pub struct Fader {
    fadein: f32,
    fadeout: f32,
    dur: f32,
    current_time: f32,
    dt: f32,
    releasing: bool,
    release_start: f32,
    release_level: f32,
    fired: bool,
    post: PostFx,
}

impl Fader {
    /// Creates a fader envelope. Times are in seconds.
    pub fn new(config: &EngineConfig, fadein: f32, fadeout: f32, dur: f32) -> Self {
        Self {
            fadein: fadein.max(0.0),
            fadeout: fadeout.max(0.0),
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

    /// Level of the sustained (non-releasing) shape at time `t`.
    fn shape_at(&self, t: f32) -> f32 {
        let rise = if self.fadein > 0.0 && t < self.fadein {
            t / self.fadein
        } else {
            1.0
        };
        if self.dur > 0.0 {
            if t >= self.dur {
                return 0.0;
            }
            if self.fadeout > 0.0 && t > self.dur - self.fadeout {
                return rise.min((self.dur - t) / self.fadeout);
            }
        }
        rise
    }
}

impl Node for Fader {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], trig: &mut [f32]) {
        for (i, x) in out.iter_mut().enumerate() {
            let t = self.current_time;
            let level = if self.releasing {
                let elapsed = t - self.release_start;
                if self.fadeout > 0.0 && elapsed < self.fadeout {
                    self.release_level * (1.0 - elapsed / self.fadeout)
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
            ("fadein", [v]) => {
                self.fadein = v.max(0.0);
                Ok(())
            }
            ("fadeout", [v]) => {
                self.fadeout = v.max(0.0);
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
            ("fadein" | "fadeout" | "dur" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
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

    fn collect(srv: &mut Server, id: caudal_core::StreamId, ticks: usize) -> (Vec<f32>, Vec<f32>) {
        let mut samples = Vec::new();
        let mut pulses = Vec::new();
        for _ in 0..ticks {
            srv.tick();
            samples.extend_from_slice(srv.stream(id).unwrap().data());
            pulses.extend_from_slice(srv.stream(id).unwrap().trigger().data());
        }
        (samples, pulses)
    }

    #[test]
    fn rise_hold_fall_and_single_pulse() {
        // 44100/64: fadein 0.01 s = 441 samples, dur 0.5 s, fadeout 0.1 s.
        let cfg = EngineConfig::new(44100.0, 64, 2);
        let mut srv = Server::new(cfg);
        let id = srv.register(Box::new(Fader::new(&cfg, 0.01, 0.1, 0.5)));
        srv.play(id, 0.0, 0.0).unwrap();

        let ticks = (0.6 * 44100.0 / 64.0) as usize + 1;
        let (samples, pulses) = collect(&mut srv, id, ticks);

        // Linear rise over the first 441 samples.
        assert_eq!(samples[0], 0.0);
        assert!((samples[220] - 220.0 / 441.0).abs() < 1e-4);
        assert!((samples[441] - 1.0).abs() < 1e-4);

        // Sustain until the fall begins at 0.4 s.
        let hold = (0.2 * 44100.0) as usize;
        assert_eq!(samples[hold], 1.0);

        // Falling halfway through the fadeout (t = 0.45 s).
        let mid_fall = (0.45 * 44100.0) as usize;
        assert!((samples[mid_fall] - 0.5).abs() < 1e-3);

        // Zero after dur, exactly one pulse at the crossing.
        let after = (0.55 * 44100.0) as usize;
        assert_eq!(samples[after], 0.0);
        let total: f32 = pulses.iter().sum();
        assert_eq!(total, 1.0);
        let pulse_at = pulses.iter().position(|&p| p == 1.0).unwrap();
        assert!((pulse_at as f32 / 44100.0 - 0.5).abs() < 1e-3);
    }

    #[test]
    fn deferred_stop_launches_release() {
        let cfg = EngineConfig::new(48000.0, 48, 2);
        let mut srv = Server::new(cfg);
        // No dur: sustains forever until stopped.
        let id = srv.register(Box::new(Fader::new(&cfg, 0.001, 0.01, 0.0)));
        srv.play(id, 0.0, 0.0).unwrap();
        for _ in 0..100 {
            srv.tick();
        }
        assert_eq!(srv.stream(id).unwrap().data()[47], 1.0);

        // 0.02 s stop wait = 20 ticks; the 0.01 s release fits inside it.
        srv.stop(id, 0.02).unwrap();
        srv.tick();
        let first = srv.stream(id).unwrap().data();
        assert!(first[47] < 0.95, "release should be falling, got {}", first[47]);
        for _ in 0..15 {
            srv.tick();
        }
        assert!(srv.stream(id).unwrap().data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn replay_resets_clock() {
        let cfg = EngineConfig::new(48000.0, 48, 2);
        let mut srv = Server::new(cfg);
        let id = srv.register(Box::new(Fader::new(&cfg, 0.01, 0.01, 0.0)));
        srv.play(id, 0.0, 0.0).unwrap();
        for _ in 0..50 {
            srv.tick();
        }
        srv.stop(id, 0.0).unwrap();
        srv.tick();
        srv.play(id, 0.0, 0.0).unwrap();
        srv.tick();
        // Rise restarts from zero.
        assert_eq!(srv.stream(id).unwrap().data()[0], 0.0);
    }
}
