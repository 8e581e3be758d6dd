//! Logarithmically-spaced bandpass splitter.

use crate::param::control;
use caudal_core::{
    AttrError, Biquad, BiquadCoeffs, EngineConfig, Node, Param, PostFx, StreamId, Tick,
};
use libm::{powf, sqrtf};
use std::sync::{Arc, Mutex, PoisonError};

struct Core {
    input: StreamId,
    min: Param,
    max: Param,
    filters: Vec<Biquad>,
    sample_rate: f32,
    /// Grid the current coefficients were computed for.
    applied: (f32, f32),
    out: Vec<Vec<f32>>,
    computed: Option<u64>,
}

impl Core {
    fn new(config: &EngineConfig, input: StreamId, bands: usize, min: Param, max: Param) -> Self {
        Self {
            input,
            min,
            max,
            filters: vec![Biquad::new(); bands],
            sample_rate: config.sample_rate,
            applied: (0.0, 0.0),
            out: vec![vec![0.0; config.buffer_size]; bands],
            computed: None,
        }
    }

    /// Recomputes the whole filter grid. Control path only.
    fn retune(&mut self, min: f32, max: f32) {
        self.applied = (min, max);
        let bands = self.filters.len() as f32;
        // Log-spaced band bounds; constant Q follows from the fixed ratio.
        let ratio = powf(max / min, 1.0 / bands);
        let q = sqrtf(ratio) / (ratio - 1.0);
        for (i, filter) in self.filters.iter_mut().enumerate() {
            let lower = min * powf(ratio, i as f32);
            let center = lower * sqrtf(ratio);
            filter.set_coeffs(BiquadCoeffs::bandpass(center, q, self.sample_rate));
        }
    }

    fn ensure(&mut self, tick: &Tick<'_>) {
        if self.computed == Some(tick.count()) {
            return;
        }
        self.computed = Some(tick.count());

        let min = control(tick, &self.min).max(1.0);
        let max = control(tick, &self.max).max(min * 2.0);
        if (min, max) != self.applied {
            self.retune(min, max);
        }

        let input = tick.stream(self.input);
        for (filter, out) in self.filters.iter_mut().zip(&mut self.out) {
            for (y, &x) in out.iter_mut().zip(input) {
                *y = filter.process(x);
            }
        }
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.sample_rate = config.sample_rate;
        for buf in &mut self.out {
            buf.clear();
            buf.resize(config.buffer_size, 0.0);
        }
        for filter in &mut self.filters {
            filter.reset();
        }
        // Force a retune against the new rate on the next tick.
        self.applied = (0.0, 0.0);
        self.computed = None;
    }
}

/// One band of a shared splitter core.
pub struct BandTap {
    core: Arc<Mutex<Core>>,
    band: usize,
    post: PostFx,
}

/// Creates an N-band splitter, returning one tap node per band.
///
/// Bands are 2-pole constant-Q bandpass sections on a logarithmic grid from
/// `min` to `max` Hz. The shared core filters the input once per tick; each
/// tap exposes one band as its own stream. Coefficients are recomputed only
/// when the grid changes.
pub fn band_splitter(
    config: &EngineConfig,
    input: StreamId,
    bands: usize,
    min: Param,
    max: Param,
) -> Vec<BandTap> {
    let bands = bands.max(1);
    let core = Arc::new(Mutex::new(Core::new(config, input, bands, min, max)));
    (0..bands)
        .map(|band| BandTap {
            core: Arc::clone(&core),
            band,
            post: PostFx::new(),
        })
        .collect()
}

impl Node for BandTap {
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
            ("min", [v]) => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                core.min = (*v).into();
                Ok(())
            }
            ("max", [v]) => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                core.max = (*v).into();
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
            ("min" | "max" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }
}
