//! Four-band Linkwitz-Riley crossover.

use crate::param::control;
use caudal_core::{
    AttrError, Biquad, BiquadCoeffs, EngineConfig, Node, Param, PostFx, StreamId, Tick,
};
use std::sync::{Arc, Mutex, PoisonError};

/// Butterworth Q; two cascaded sections make one 4th-order LR stage.
const BUTTERWORTH_Q: f32 = core::f32::consts::FRAC_1_SQRT_2;

/// One 4th-order Linkwitz-Riley crossover: complementary low and high
/// branches, each two cascaded 2nd-order Butterworth sections.
struct Crossover {
    low: [Biquad; 2],
    high: [Biquad; 2],
}

impl Crossover {
    fn new() -> Self {
        Self {
            low: [Biquad::new(), Biquad::new()],
            high: [Biquad::new(), Biquad::new()],
        }
    }

    fn tune(&mut self, freq: f32, sample_rate: f32) {
        let lp = BiquadCoeffs::lowpass(freq, BUTTERWORTH_Q, sample_rate);
        let hp = BiquadCoeffs::highpass(freq, BUTTERWORTH_Q, sample_rate);
        for section in &mut self.low {
            section.set_coeffs(lp);
        }
        for section in &mut self.high {
            section.set_coeffs(hp);
        }
    }

    fn reset(&mut self) {
        for section in self.low.iter_mut().chain(self.high.iter_mut()) {
            section.reset();
        }
    }

    /// Splits one sample into (low, high).
    #[inline]
    fn split(&mut self, x: f32) -> (f32, f32) {
        let low = self.low[0].process(x);
        let low = self.low[1].process(low);
        let high = self.high[0].process(x);
        let high = self.high[1].process(high);
        (low, high)
    }
}

struct Core {
    input: StreamId,
    freqs: [Param; 3],
    stages: [Crossover; 3],
    sample_rate: f32,
    applied: [f32; 3],
    out: [Vec<f32>; 4],
    computed: Option<u64>,
}

impl Core {
    fn new(config: &EngineConfig, input: StreamId, freqs: [Param; 3]) -> Self {
        Self {
            input,
            freqs,
            stages: [Crossover::new(), Crossover::new(), Crossover::new()],
            sample_rate: config.sample_rate,
            applied: [0.0; 3],
            out: core::array::from_fn(|_| vec![0.0; config.buffer_size]),
            computed: None,
        }
    }

    fn ensure(&mut self, tick: &Tick<'_>) {
        if self.computed == Some(tick.count()) {
            return;
        }
        self.computed = Some(tick.count());

        let freqs = [
            control(tick, &self.freqs[0]).max(10.0),
            control(tick, &self.freqs[1]).max(10.0),
            control(tick, &self.freqs[2]).max(10.0),
        ];
        if freqs != self.applied {
            self.applied = freqs;
            for (stage, &f) in self.stages.iter_mut().zip(freqs.iter()) {
                stage.tune(f, self.sample_rate);
            }
        }

        // Cascade: split at f1, then split the high branch at f2, then f3.
        let input = tick.stream(self.input);
        for (i, &x) in input.iter().enumerate() {
            let (band0, rest) = self.stages[0].split(x);
            let (band1, rest) = self.stages[1].split(rest);
            let (band2, band3) = self.stages[2].split(rest);
            self.out[0][i] = band0;
            self.out[1][i] = band1;
            self.out[2][i] = band2;
            self.out[3][i] = band3;
        }
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.sample_rate = config.sample_rate;
        for buf in &mut self.out {
            buf.clear();
            buf.resize(config.buffer_size, 0.0);
        }
        for stage in &mut self.stages {
            stage.reset();
        }
        self.applied = [0.0; 3];
        self.computed = None;
    }
}

/// One band of a shared four-band crossover core.
pub struct FourBandTap {
    core: Arc<Mutex<Core>>,
    band: usize,
    post: PostFx,
}

/// Creates a four-band crossover, returning the four band taps in
/// ascending frequency order.
///
/// Three cascaded 4th-order Linkwitz-Riley stages at `f1 < f2 < f3` produce
/// complementary bands that sum back to the input with flat magnitude.
pub fn four_band(
    config: &EngineConfig,
    input: StreamId,
    f1: Param,
    f2: Param,
    f3: Param,
) -> [FourBandTap; 4] {
    let core = Arc::new(Mutex::new(Core::new(config, input, [f1, f2, f3])));
    core::array::from_fn(|band| FourBandTap {
        core: Arc::clone(&core),
        band,
        post: PostFx::new(),
    })
}

impl Node for FourBandTap {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        core.ensure(tick);
        out.copy_from_slice(&core.out[self.band]);
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, config: &EngineConfig) {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        core.configure(config);
    }

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("freq1", [v]) => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                core.freqs[0] = (*v).into();
                Ok(())
            }
            ("freq2", [v]) => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                core.freqs[1] = (*v).into();
                Ok(())
            }
            ("freq3", [v]) => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                core.freqs[2] = (*v).into();
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
            ("freq1" | "freq2" | "freq3" | "mul" | "add", _) => Err(AttrError::Arity {
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
    use crate::Sig;
    use caudal_core::Server;

    #[test]
    fn dc_lands_in_lowest_band() {
        let cfg = EngineConfig::new(48000.0, 64, 2);
        let mut srv = Server::new(cfg);
        let src = srv.register_named("src", Box::new(Sig::new(1.0)));
        let taps = four_band(
            &cfg,
            src,
            Param::Constant(200.0),
            Param::Constant(1000.0),
            Param::Constant(5000.0),
        );
        let ids: Vec<_> = taps
            .into_iter()
            .map(|t| {
                let id = srv.register(Box::new(t));
                srv.play(id, 0.0, 0.0).unwrap();
                id
            })
            .collect();
        srv.play(src, 0.0, 0.0).unwrap();
        for _ in 0..800 {
            srv.tick();
        }
        let levels: Vec<f32> = ids
            .iter()
            .map(|&id| srv.stream(id).unwrap().data()[63].abs())
            .collect();
        assert!((levels[0] - 1.0).abs() < 0.01, "low band DC gain: {}", levels[0]);
        for (i, &l) in levels.iter().enumerate().skip(1) {
            assert!(l < 0.01, "band {i} should reject DC, got {l}");
        }
    }

    #[test]
    fn bands_sum_flat_for_dc() {
        // LR crossovers are magnitude-complementary: the band sum equals
        // the input at DC once settled.
        let cfg = EngineConfig::new(48000.0, 64, 2);
        let mut srv = Server::new(cfg);
        let src = srv.register(Box::new(Sig::new(0.5)));
        let taps = four_band(
            &cfg,
            src,
            Param::Constant(200.0),
            Param::Constant(1000.0),
            Param::Constant(5000.0),
        );
        let ids: Vec<_> = taps
            .into_iter()
            .map(|t| {
                let id = srv.register(Box::new(t));
                srv.play(id, 0.0, 0.0).unwrap();
                id
            })
            .collect();
        srv.play(src, 0.0, 0.0).unwrap();
        for _ in 0..800 {
            srv.tick();
        }
        let sum: f32 = ids
            .iter()
            .map(|&id| srv.stream(id).unwrap().data()[63])
            .sum();
        assert!((sum - 0.5).abs() < 0.01, "band sum was {sum}");
    }
}
