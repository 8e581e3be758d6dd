//! Waveguide reverb network.

use crate::param::control;
use caudal_core::{
    AttrError, DelayLine, EngineConfig, Node, OnePole, Param, PostFx, StreamId, Tick,
    flush_denormal,
};
use core::f32::consts::TAU;
use libm::sinf;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Mutually-detuned waveguide line lengths in seconds.
pub(crate) const LINE_SECONDS: [f32; 8] = [
    0.0297, 0.0371, 0.0411, 0.0437, 0.0533, 0.0587, 0.0641, 0.0677,
];

/// Extra capacity beyond the modulated maximum, in samples.
const LINE_MARGIN: usize = 8;

/// One waveguide: a modulated delay line plus its damping filter.
pub(crate) struct Line {
    pub(crate) delay: DelayLine,
    pub(crate) damper: OnePole,
    base: f32,
    mod_depth: f32,
    mod_rate: f32,
    mod_phase: f32,
}

impl Line {
    pub(crate) fn new(seconds: f32, sample_rate: f32, rng: &mut SmallRng) -> Self {
        let base = seconds * sample_rate;
        // Randomized micro-modulation decorrelates the lines.
        let mod_depth = rng.gen_range(0.3..1.5);
        let mod_rate = rng.gen_range(0.4..1.2) / sample_rate;
        Self {
            delay: DelayLine::new(base as usize + LINE_MARGIN),
            damper: OnePole::new(sample_rate, 5000.0),
            base,
            mod_depth,
            mod_rate,
            mod_phase: rng.gen_range(0.0..1.0),
        }
    }

    #[inline]
    pub(crate) fn tap(&mut self) -> f32 {
        self.mod_phase += self.mod_rate;
        if self.mod_phase >= 1.0 {
            self.mod_phase -= 1.0;
        }
        let delay = self.base + self.mod_depth * sinf(TAU * self.mod_phase);
        self.delay.read_frac(delay)
    }
}

/// Eight-line waveguide reverb.
///
/// The lines meet at a scattering junction: `junction = Σ taps / 4` (the
/// lossless junction pressure for eight waveguides), and each line is fed
/// `input + feedback * damp(junction - own_tap)`. Per-line one-pole dampers
/// absorb high frequencies; their coefficient is recomputed only when the
/// cutoff changes. Line lengths are micro-modulated by per-line randomized
/// LFOs to break up metallic resonances.
///
/// `balance` mixes dry against the junction output. With zero feedback and
/// zero input the network is exactly silent once the longest line has
/// flushed.
pub struct WgVerb {
    input: StreamId,
    feedback: Param,
    cutoff: Param,
    balance: Param,
    lines: [Line; 8],
    sample_rate: f32,
    post: PostFx,
}

impl WgVerb {
    /// Creates a reverb reading from `input`.
    pub fn new(
        config: &EngineConfig,
        input: StreamId,
        feedback: Param,
        cutoff: Param,
        balance: Param,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(0x7764_7665);
        let lines = core::array::from_fn(|i| Line::new(LINE_SECONDS[i], config.sample_rate, &mut rng));
        Self {
            input,
            feedback,
            cutoff,
            balance,
            lines,
            sample_rate: config.sample_rate,
            post: PostFx::new(),
        }
    }

    /// Rebinds the input stream.
    pub fn set_input(&mut self, input: StreamId) {
        self.input = input;
    }
}

impl Node for WgVerb {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        let input = tick.stream(self.input);
        let feedback = control(tick, &self.feedback).clamp(0.0, 1.0);
        let cutoff = control(tick, &self.cutoff).max(20.0);
        let balance = control(tick, &self.balance).clamp(0.0, 1.0);
        for line in &mut self.lines {
            line.damper.set_frequency(cutoff);
        }

        let mut taps = [0.0f32; 8];
        for (x, &dry) in out.iter_mut().zip(input) {
            let mut sum = 0.0;
            for (tap, line) in taps.iter_mut().zip(&mut self.lines) {
                *tap = line.tap();
                sum += *tap;
            }
            let junction = sum * 0.25;
            for (&tap, line) in taps.iter().zip(&mut self.lines) {
                let reflected = line.damper.process(junction - tap);
                line.delay.write(flush_denormal(dry + feedback * reflected));
            }
            *x = dry * (1.0 - balance) + junction * balance;
        }
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, config: &EngineConfig) {
        if config.sample_rate != self.sample_rate {
            self.sample_rate = config.sample_rate;
            let mut rng = SmallRng::seed_from_u64(0x7764_7665);
            self.lines = core::array::from_fn(|i| {
                Line::new(LINE_SECONDS[i], config.sample_rate, &mut rng)
            });
        }
    }

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("feedback", [v]) => {
                self.feedback = (*v).into();
                Ok(())
            }
            ("cutoff", [v]) => {
                self.cutoff = (*v).into();
                Ok(())
            }
            ("bal", [v]) => {
                self.balance = (*v).into();
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
            ("feedback" | "cutoff" | "bal" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }

    fn set_param(&mut self, key: &str, value: Param) -> Result<(), AttrError> {
        match key {
            "feedback" => {
                self.feedback = value;
                Ok(())
            }
            "cutoff" => {
                self.cutoff = value;
                Ok(())
            }
            "bal" => {
                self.balance = value;
                Ok(())
            }
            "mul" => {
                self.post.set_mul(value);
                Ok(())
            }
            "add" => {
                self.post.set_add(value);
                Ok(())
            }
            "sub" => {
                self.post.set_sub(value);
                Ok(())
            }
            "div" => {
                self.post.set_div(value);
                Ok(())
            }
            _ => Err(AttrError::Unknown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sig;
    use caudal_core::Server;

    fn setup(feedback: f32) -> (Server, StreamId, StreamId) {
        let cfg = EngineConfig::new(48000.0, 64, 2);
        let mut srv = Server::new(cfg);
        let src = srv.register_named("src", Box::new(Sig::new(0.0)));
        let rev = srv.register(Box::new(WgVerb::new(
            &cfg,
            src,
            Param::Constant(feedback),
            Param::Constant(5000.0),
            Param::Constant(1.0),
        )));
        srv.play(src, 0.0, 0.0).unwrap();
        srv.play(rev, 0.0, 0.0).unwrap();
        (srv, src, rev)
    }

    #[test]
    fn zero_feedback_is_silent_after_warmup() {
        let (mut srv, _src, rev) = setup(0.0);
        // One block of DC excitation, then silence.
        srv.set_value("src", &[1.0]).unwrap();
        srv.tick();
        srv.set_value("src", &[0.0]).unwrap();
        // Longest line is ~0.068 s = ~3250 samples; 100 ticks flushes it.
        for _ in 0..100 {
            srv.tick();
        }
        assert!(srv.stream(rev).unwrap().data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn feedback_sustains_a_tail() {
        let (mut srv, _src, rev) = setup(0.9);
        srv.set_value("src", &[1.0]).unwrap();
        srv.tick();
        srv.set_value("src", &[0.0]).unwrap();
        for _ in 0..100 {
            srv.tick();
        }
        let energy: f32 = srv
            .stream(rev)
            .unwrap()
            .data()
            .iter()
            .map(|x| x * x)
            .sum();
        assert!(energy > 0.0, "tail should persist with feedback");
    }

    #[test]
    fn output_stays_finite() {
        let (mut srv, _src, rev) = setup(1.0);
        srv.set_value("src", &[0.5]).unwrap();
        for _ in 0..500 {
            srv.tick();
            assert!(srv.stream(rev).unwrap().data().iter().all(|x| x.is_finite()));
        }
    }

    #[test]
    fn balance_zero_passes_dry() {
        let cfg = EngineConfig::new(48000.0, 16, 2);
        let mut srv = Server::new(cfg);
        let src = srv.register(Box::new(Sig::new(0.25)));
        let rev = srv.register(Box::new(WgVerb::new(
            &cfg,
            src,
            Param::Constant(0.5),
            Param::Constant(5000.0),
            Param::Constant(0.0),
        )));
        srv.play(src, 0.0, 0.0).unwrap();
        srv.play(rev, 0.0, 0.0).unwrap();
        srv.tick();
        assert!(srv.stream(rev).unwrap().data().iter().all(|&x| x == 0.25));
    }
}
