//! Stereo waveguide reverb with first reflections.

use crate::param::control;
use crate::wgverb::{LINE_SECONDS, Line};
use caudal_core::{
    AttrError, DelayLine, EngineConfig, Node, Param, PostFx, StreamId, Tick, flush_denormal,
};
use core::f32::consts::FRAC_PI_2;
use libm::{cosf, powf, sinf};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex, PoisonError};

/// First-reflection tap delays in seconds, with per-tap pan offsets.
const REFLECTION_TAPS: [(f32, f32); 6] = [
    (0.0043, -0.25),
    (0.0118, 0.15),
    (0.0215, -0.1),
    (0.0225, 0.3),
    (0.0268, -0.2),
    (0.0298, 0.1),
];

/// The right-channel bank is detuned against the left to decorrelate.
const RIGHT_DETUNE: f32 = 1.011;

struct Bank {
    lines: [Line; 8],
    /// Per-line feedback gains derived from revtime.
    gains: [f32; 8],
}

impl Bank {
    fn new(sample_rate: f32, roomscale: f32, detune: f32, rng: &mut SmallRng) -> Self {
        let lines = core::array::from_fn(|i| {
            Line::new(LINE_SECONDS[i] * roomscale * detune, sample_rate, rng)
        });
        Self {
            lines,
            gains: [0.0; 8],
        }
    }

    fn set_revtime(&mut self, revtime: f32, roomscale: f32, detune: f32) {
        for (gain, &seconds) in self.gains.iter_mut().zip(LINE_SECONDS.iter()) {
            // RT60: the loop gain that decays 60 dB over `revtime` seconds.
            *gain = powf(10.0, -3.0 * seconds * roomscale * detune / revtime.max(0.01));
        }
    }

    fn set_cutoff(&mut self, cutoff: f32) {
        for line in &mut self.lines {
            line.damper.set_frequency(cutoff);
        }
    }

    #[inline]
    fn process(&mut self, dry: f32) -> f32 {
        let mut taps = [0.0f32; 8];
        let mut sum = 0.0;
        for (tap, line) in taps.iter_mut().zip(&mut self.lines) {
            *tap = line.tap();
            sum += *tap;
        }
        let junction = sum * 0.25;
        for ((&tap, &gain), line) in taps.iter().zip(&self.gains).zip(&mut self.lines) {
            let reflected = line.damper.process(junction - tap);
            line.delay.write(flush_denormal(dry + gain * reflected));
        }
        junction
    }
}

struct Core {
    input: StreamId,
    pan: Param,
    revtime: Param,
    cutoff: Param,
    bal: Param,
    roomscale: f32,
    banks: [Bank; 2],
    reflections: DelayLine,
    sample_rate: f32,
    applied_revtime: f32,
    out: [Vec<f32>; 2],
    computed: Option<u64>,
}

impl Core {
    fn new(
        config: &EngineConfig,
        input: StreamId,
        pan: Param,
        revtime: Param,
        cutoff: Param,
        bal: Param,
        roomscale: f32,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(0x5374_5256);
        let roomscale = roomscale.max(0.25);
        let banks = [
            Bank::new(config.sample_rate, roomscale, 1.0, &mut rng),
            Bank::new(config.sample_rate, roomscale, RIGHT_DETUNE, &mut rng),
        ];
        let max_refl = REFLECTION_TAPS
            .iter()
            .fold(0.0f32, |acc, &(t, _)| acc.max(t));
        Self {
            input,
            pan,
            revtime,
            cutoff,
            bal,
            roomscale,
            banks,
            reflections: DelayLine::new((max_refl * roomscale * config.sample_rate) as usize + 2),
            sample_rate: config.sample_rate,
            applied_revtime: -1.0,
            out: [
                vec![0.0; config.buffer_size],
                vec![0.0; config.buffer_size],
            ],
            computed: None,
        }
    }

    /// Computes both channels once per tick, whichever tap runs first.
    fn ensure(&mut self, tick: &Tick<'_>) {
        if self.computed == Some(tick.count()) {
            return;
        }
        self.computed = Some(tick.count());

        let input = tick.stream(self.input);
        let pan = control(tick, &self.pan).clamp(0.0, 1.0);
        let revtime = control(tick, &self.revtime).max(0.01);
        let cutoff = control(tick, &self.cutoff).max(20.0);
        let bal = control(tick, &self.bal).clamp(0.0, 1.0);

        if revtime != self.applied_revtime {
            self.applied_revtime = revtime;
            self.banks[0].set_revtime(revtime, self.roomscale, 1.0);
            self.banks[1].set_revtime(revtime, self.roomscale, RIGHT_DETUNE);
        }
        self.banks[0].set_cutoff(cutoff);
        self.banks[1].set_cutoff(cutoff);

        // Source-position gains for every reflection tap, recomputed each
        // tick so a streaming pan moves the image continuously.
        let mut refl_gains = [(0.0f32, 0.0f32); REFLECTION_TAPS.len()];
        for (gains, &(_, offset)) in refl_gains.iter_mut().zip(REFLECTION_TAPS.iter()) {
            let p = (pan + offset).clamp(0.0, 1.0);
            *gains = (cosf(p * FRAC_PI_2), sinf(p * FRAC_PI_2));
        }

        let n = tick.buffer_size();
        for i in 0..n {
            let dry = input.get(i).copied().unwrap_or(0.0);
            self.reflections.write(dry);

            let mut refl_l = 0.0;
            let mut refl_r = 0.0;
            for (&(seconds, _), &(gl, gr)) in REFLECTION_TAPS.iter().zip(refl_gains.iter()) {
                let tap = self
                    .reflections
                    .read_frac(seconds * self.roomscale * self.sample_rate);
                refl_l += tap * gl;
                refl_r += tap * gr;
            }
            let scale = 1.0 / REFLECTION_TAPS.len() as f32;
            refl_l *= scale;
            refl_r *= scale;

            let wet_l = self.banks[0].process(dry + refl_l);
            let wet_r = self.banks[1].process(dry + refl_r);
            self.out[0][i] = dry * (1.0 - bal) + (wet_l + refl_l) * bal;
            self.out[1][i] = dry * (1.0 - bal) + (wet_r + refl_r) * bal;
        }
    }

    fn configure(&mut self, config: &EngineConfig) {
        for buf in &mut self.out {
            buf.clear();
            buf.resize(config.buffer_size, 0.0);
        }
        if config.sample_rate != self.sample_rate {
            let mut rng = SmallRng::seed_from_u64(0x5374_5256);
            self.sample_rate = config.sample_rate;
            self.banks = [
                Bank::new(config.sample_rate, self.roomscale, 1.0, &mut rng),
                Bank::new(config.sample_rate, self.roomscale, RIGHT_DETUNE, &mut rng),
            ];
            let max_refl = REFLECTION_TAPS
                .iter()
                .fold(0.0f32, |acc, &(t, _)| acc.max(t));
            self.reflections =
                DelayLine::new((max_refl * self.roomscale * config.sample_rate) as usize + 2);
            self.applied_revtime = -1.0;
        }
        self.computed = None;
    }
}

/// One output channel of a shared stereo reverb core.
pub struct StReverbTap {
    core: Arc<Mutex<Core>>,
    channel: usize,
    post: PostFx,
}

/// Creates a stereo reverb, returning its left and right channel taps.
///
/// Register both taps with the server and route them to separate hardware
/// channels. The shared core computes both channels once per tick under its
/// own guard, so tap registration order does not matter.
pub fn st_reverb(
    config: &EngineConfig,
    input: StreamId,
    pan: Param,
    revtime: Param,
    cutoff: Param,
    bal: Param,
    roomscale: f32,
) -> (StReverbTap, StReverbTap) {
    let core = Arc::new(Mutex::new(Core::new(
        config, input, pan, revtime, cutoff, bal, roomscale,
    )));
    (
        StReverbTap {
            core: Arc::clone(&core),
            channel: 0,
            post: PostFx::new(),
        },
        StReverbTap {
            core,
            channel: 1,
            post: PostFx::new(),
        },
    )
}

impl Node for StReverbTap {
    fn compute(&mut self, tick: &Tick<'_>, out: &mut [f32], _trig: &mut [f32]) {
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        core.ensure(tick);
        out.copy_from_slice(&core.out[self.channel]);
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
        let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
        match (key, values) {
            ("pan", [v]) => {
                core.pan = (*v).into();
                Ok(())
            }
            ("revtime", [v]) => {
                core.revtime = (*v).into();
                Ok(())
            }
            ("cutoff", [v]) => {
                core.cutoff = (*v).into();
                Ok(())
            }
            ("bal", [v]) => {
                core.bal = (*v).into();
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
            ("pan" | "revtime" | "cutoff" | "bal" | "mul" | "add", _) => Err(AttrError::Arity {
                expected: 1,
                got: values.len(),
            }),
            _ => Err(AttrError::Unknown),
        }
    }

    fn set_param(&mut self, key: &str, value: Param) -> Result<(), AttrError> {
        match key {
            "pan" | "revtime" | "cutoff" | "bal" => {
                let mut core = self.core.lock().unwrap_or_else(PoisonError::into_inner);
                match key {
                    "pan" => core.pan = value,
                    "revtime" => core.revtime = value,
                    "cutoff" => core.cutoff = value,
                    _ => core.bal = value,
                }
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
