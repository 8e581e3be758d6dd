//! Breakpoint line-segment envelope.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use caudal_core::{AttrError, EngineConfig, Node, PostFx, Tick};

/// Piecewise-linear envelope over `(time, value)` breakpoints.
///
/// Breakpoint times are absolute seconds from activation, ascending.
/// Non-looping envelopes hold the final value indefinitely after the last
/// breakpoint, fire the completion pulse exactly once, and every subsequent
/// tick is bit-identical. Looping envelopes wrap the clock at the final
/// breakpoint time and never complete.
///
/// `pause` freezes the clock at the current value; pausing a completed
/// envelope is a no-op.
pub struct Linseg {
    points: Vec<(f32, f32)>,
    loop_mode: bool,
    current_time: f32,
    dt: f32,
    paused: bool,
    completed: bool,
    post: PostFx,
}

impl Linseg {
    /// Creates a line-segment envelope from ascending `(time, value)` pairs.
    pub fn new(config: &EngineConfig, points: Vec<(f32, f32)>, loop_mode: bool) -> Self {
        Self {
            points,
            loop_mode,
            current_time: 0.0,
            dt: 1.0 / config.sample_rate,
            paused: false,
            completed: false,
            post: PostFx::new(),
        }
    }

    /// Freezes the clock at the current value. No-op once completed.
    pub fn pause(&mut self) {
        if !self.completed {
            self.paused = true;
        }
    }

    /// Resumes a paused envelope.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Total time span of the breakpoint list.
    fn span(&self) -> f32 {
        self.points.last().map_or(0.0, |&(t, _)| t)
    }

    /// Linear interpolation of the breakpoint list at time `t`.
    fn value_at(&self, t: f32) -> f32 {
        let Some(&(first_t, first_v)) = self.points.first() else {
            return 0.0;
        };
        if t <= first_t {
            return first_v;
        }
        for pair in self.points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            if t < t1 {
                let frac = if t1 > t0 { (t - t0) / (t1 - t0) } else { 1.0 };
                return v0 + (v1 - v0) * frac;
            }
        }
        self.points.last().map_or(0.0, |&(_, v)| v)
    }
}

impl Node for Linseg {
    fn compute(&mut self, _tick: &Tick<'_>, out: &mut [f32], trig: &mut [f32]) {
        let span = self.span();
        for (i, x) in out.iter_mut().enumerate() {
            if self.paused || self.completed {
                *x = self.value_at(self.current_time.min(span));
                continue;
            }
            *x = self.value_at(self.current_time);
            self.current_time += self.dt;
            if self.loop_mode {
                if span > 0.0 && self.current_time >= span {
                    self.current_time -= span;
                }
            } else if self.current_time >= span {
                self.completed = true;
                trig[i] = 1.0;
            }
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
            // Flattened [t0, v0, t1, v1, ...] breakpoint list.
            ("list", vs) if !vs.is_empty() && vs.len() % 2 == 0 => {
                self.points = vs.chunks_exact(2).map(|p| (p[0], p[1])).collect();
                self.completed = false;
                Ok(())
            }
            ("list", vs) => Err(AttrError::Arity {
                expected: 2,
                got: vs.len(),
            }),
            ("pause", [v]) => {
                if *v != 0.0 {
                    self.pause();
                } else {
                    self.resume();
                }
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
            ("pause" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }

    fn on_play(&mut self) {
        self.current_time = 0.0;
        self.paused = false;
        self.completed = false;
    }
}
