//! Yin autocorrelation pitch tracker.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use caudal_core::{AttrError, EngineConfig, Node, OnePole, PostFx, StreamId, Tick};

/// Fundamental-frequency estimator over fixed-size analysis windows.
///
/// Input samples are lowpass-prefiltered and collected into a window of
/// `winsize` samples. Each full window runs the Yin analysis: cumulative
/// mean normalized difference function, first local dip below `tolerance`
/// (falling back to the global minimum), quadratic interpolation over the
/// three neighboring lags, and lag-to-frequency conversion clamped to
/// `[minfreq, maxfreq]`. The output stream holds the latest estimate in Hz;
/// a trigger pulse marks the sample at which each new estimate lands.
pub struct Yin {
    input: StreamId,
    tolerance: f32,
    minfreq: f32,
    maxfreq: f32,
    prefilter: OnePole,
    window: Vec<f32>,
    filled: usize,
    /// Scratch for the normalized difference function, `winsize / 2` lags.
    cmnd: Vec<f32>,
    estimate: f32,
    sample_rate: f32,
    post: PostFx,
}

impl Yin {
    /// Creates a pitch tracker reading from `input`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &EngineConfig,
        input: StreamId,
        tolerance: f32,
        minfreq: f32,
        maxfreq: f32,
        winsize: usize,
        cutoff: f32,
    ) -> Self {
        let winsize = winsize.max(64);
        Self {
            input,
            tolerance: tolerance.clamp(0.01, 1.0),
            minfreq: minfreq.max(1.0),
            maxfreq: maxfreq.max(minfreq.max(1.0) * 2.0),
            prefilter: OnePole::new(config.sample_rate, cutoff),
            window: vec![0.0; winsize],
            filled: 0,
            cmnd: vec![0.0; winsize / 2],
            estimate: 0.0,
            sample_rate: config.sample_rate,
            post: PostFx::new(),
        }
    }

    /// Latest frequency estimate in Hz.
    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    /// Runs the Yin analysis over the filled window.
    fn analyze(&mut self) -> f32 {
        let half = self.window.len() / 2;

        // Difference function, then cumulative mean normalization.
        self.cmnd[0] = 1.0;
        let mut running = 0.0f32;
        for tau in 1..half {
            let mut diff = 0.0f32;
            for j in 0..half {
                let d = self.window[j] - self.window[j + tau];
                diff += d * d;
            }
            running += diff;
            self.cmnd[tau] = if running > 0.0 {
                diff * tau as f32 / running
            } else {
                1.0
            };
        }

        // Search lags covering [minfreq, maxfreq].
        let lo = ((self.sample_rate / self.maxfreq) as usize).max(2);
        let hi = ((self.sample_rate / self.minfreq) as usize).min(half - 2);
        if lo >= hi {
            return self.estimate;
        }

        let mut best = 0usize;
        for tau in lo..=hi {
            if self.cmnd[tau] < self.tolerance
                && self.cmnd[tau] < self.cmnd[tau - 1]
                && self.cmnd[tau] <= self.cmnd[tau + 1]
            {
                best = tau;
                break;
            }
        }
        if best == 0 {
            // No dip under the tolerance: take the global minimum.
            let mut min_val = f32::MAX;
            for tau in lo..=hi {
                if self.cmnd[tau] < min_val {
                    min_val = self.cmnd[tau];
                    best = tau;
                }
            }
        }

        // Quadratic interpolation over the three neighboring lags.
        let y0 = self.cmnd[best - 1];
        let y1 = self.cmnd[best];
        let y2 = self.cmnd[best + 1];
        let denom = y0 - 2.0 * y1 + y2;
        let shift = if denom.abs() > 1e-12 {
            0.5 * (y0 - y2) / denom
        } else {
            0.0
        };
        let lag = best as f32 + shift.clamp(-0.5, 0.5);
        (self.sample_rate / lag).clamp(self.minfreq, self.maxfreq)
    }
}

impl Node for Yin {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], trig: &mut [f32]) {
        let input = tick.stream(self.input);
        for (i, (y, &x)) in out.iter_mut().zip(input).enumerate() {
            self.window[self.filled] = self.prefilter.process(x);
            self.filled += 1;
            if self.filled == self.window.len() {
                self.filled = 0;
                self.estimate = self.analyze();
                trig[i] = 1.0;
            }
            *y = self.estimate;
        }
    }

    fn post(&self) -> &PostFx {
        &self.post
    }

    fn post_mut(&mut self) -> &mut PostFx {
        &mut self.post
    }

    fn configure(&mut self, config: &EngineConfig) {
        self.sample_rate = config.sample_rate;
        self.prefilter.set_sample_rate(config.sample_rate);
        self.filled = 0;
    }

    fn set_attribute(&mut self, key: &str, values: &[f32]) -> Result<(), AttrError> {
        match (key, values) {
            ("tolerance", [v]) => {
                self.tolerance = v.clamp(0.01, 1.0);
                Ok(())
            }
            ("minfreq", [v]) => {
                self.minfreq = v.max(1.0);
                Ok(())
            }
            ("maxfreq", [v]) => {
                self.maxfreq = v.max(self.minfreq * 2.0);
                Ok(())
            }
            ("cutoff", [v]) => {
                self.prefilter.set_frequency(*v);
                Ok(())
            }
            ("winsize", [v]) => {
                let winsize = (*v as usize).max(64);
                self.window.clear();
                self.window.resize(winsize, 0.0);
                self.cmnd.clear();
                self.cmnd.resize(winsize / 2, 0.0);
                self.filled = 0;
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
            (
                "tolerance" | "minfreq" | "maxfreq" | "cutoff" | "winsize" | "mul" | "add",
                _,
            ) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }

    fn on_play(&mut self) {
        self.filled = 0;
        self.prefilter.reset();
    }
}
