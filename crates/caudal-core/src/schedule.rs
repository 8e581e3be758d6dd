//! Play/out/stop scheduling state machine.
//!
//! Every stream carries a [`Scheduler`] that decides, once per tick, whether
//! the owning node's kernel runs, whether the buffer must be forced to zero,
//! and whether the end-of-duration pulse fires. Delay, duration, and stop
//! wait are all buffer-quantized: expressed in whole ticks, never split
//! mid-buffer.
//!
//! State flow:
//!
//! ```text
//! Stopped --play/out--> Waiting(n) --n ticks--> Active --duration--> Ended
//!    ^                                            |                    |
//!    +-------------------- stop ------------------+----- next tick ----+
//! ```
//!
//! `Ended` lasts exactly one tick: the boundary tick on which the duration
//! countdown has elapsed. The server zeroes the buffer, fires one trigger
//! pulse at sample 0, and the machine falls back to `Stopped`.

use crate::config::EngineConfig;
use crate::math::{delay_ticks, duration_ticks};

/// Lifecycle state of a stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayState {
    /// Inactive: buffer zero, unrouted, kernel skipped.
    Stopped,
    /// Scheduled: counting down whole ticks of silence before activation.
    Waiting,
    /// Live: the kernel runs every tick.
    Active,
    /// Duration elapsed this tick boundary; pulses once, then stops.
    Ended,
}

/// What the server must do for a stream on the current tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct TickPlan {
    /// Run the primary kernel and post-processing.
    pub run: bool,
    /// Force the sample buffer to zero.
    pub zero: bool,
    /// Write the end-of-duration pulse at sample 0.
    pub end_pulse: bool,
    /// The stream became active on this tick (first kernel run of a play).
    pub activated: bool,
}

/// Per-stream scheduling state machine.
#[derive(Debug, Clone)]
pub struct Scheduler {
    state: PlayState,
    /// Remaining silent ticks while `Waiting`.
    wait: u32,
    /// Remaining active ticks; 0 = play indefinitely.
    remaining: u32,
    /// Pending deferred stop; 0 = none.
    stop_wait: u32,
    route: Option<usize>,
    /// Buffer must be zeroed on the next tick (entered a silent state).
    pending_zero: bool,
    /// `on_play` must be reported on the next running tick.
    just_started: bool,
}

impl Scheduler {
    pub(crate) fn new() -> Self {
        Self {
            state: PlayState::Stopped,
            wait: 0,
            remaining: 0,
            stop_wait: 0,
            route: None,
            pending_zero: false,
            just_started: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// True while the kernel is running each tick.
    pub fn is_active(&self) -> bool {
        self.state == PlayState::Active
    }

    /// Output routing channel, if routed.
    pub fn route(&self) -> Option<usize> {
        self.route
    }

    /// Starts playback without routing to hardware output.
    ///
    /// `duration` and `delay` are in seconds; zero means "indefinite" and
    /// "immediately" respectively. A delay that quantizes to zero ticks
    /// behaves exactly like `delay == 0`.
    pub fn play(&mut self, config: &EngineConfig, duration: f32, delay: f32) {
        self.stop_wait = 0;
        self.remaining = duration_ticks(duration, config);
        let n = delay_ticks(delay, config);
        if n == 0 {
            self.state = PlayState::Active;
            self.just_started = true;
        } else {
            self.state = PlayState::Waiting;
            self.wait = n;
            self.pending_zero = true;
        }
    }

    /// Starts playback routed to the given hardware channel.
    ///
    /// The channel is taken modulo the configured channel count.
    pub fn out(&mut self, config: &EngineConfig, channel: usize, duration: f32, delay: f32) {
        self.play(config, duration, delay);
        self.route = Some(channel % config.channels.max(1));
    }

    /// Stops playback.
    ///
    /// `wait == 0` (after quantization) stops within the current tick:
    /// buffer zeroed, routing cleared. A positive wait defers the Stopped
    /// transition by that many ticks without clearing the buffer, so a
    /// fade-style node can run its release curve first.
    pub fn stop(&mut self, config: &EngineConfig, wait: f32) {
        let w = duration_ticks(wait, config);
        if w == 0 {
            self.state = PlayState::Stopped;
            self.wait = 0;
            self.remaining = 0;
            self.stop_wait = 0;
            self.route = None;
            self.pending_zero = true;
        } else if self.state != PlayState::Stopped {
            self.stop_wait = w;
        }
    }

    /// Advances the machine by one tick and reports what the server must do.
    pub(crate) fn advance(&mut self) -> TickPlan {
        match self.state {
            PlayState::Stopped => TickPlan {
                zero: core::mem::take(&mut self.pending_zero),
                ..TickPlan::default()
            },
            PlayState::Waiting => {
                self.wait -= 1;
                if self.wait == 0 {
                    self.state = PlayState::Active;
                    self.just_started = true;
                }
                TickPlan {
                    zero: core::mem::take(&mut self.pending_zero),
                    ..TickPlan::default()
                }
            }
            PlayState::Active => {
                if self.stop_wait > 0 {
                    self.stop_wait -= 1;
                    if self.stop_wait == 0 {
                        self.state = PlayState::Stopped;
                        self.route = None;
                        return TickPlan {
                            zero: true,
                            ..TickPlan::default()
                        };
                    }
                }
                let activated = core::mem::take(&mut self.just_started);
                if self.remaining > 0 {
                    self.remaining -= 1;
                    if self.remaining == 0 {
                        self.state = PlayState::Ended;
                    }
                }
                TickPlan {
                    run: true,
                    activated,
                    ..TickPlan::default()
                }
            }
            PlayState::Ended => {
                self.state = PlayState::Stopped;
                self.route = None;
                TickPlan {
                    zero: true,
                    end_pulse: true,
                    ..TickPlan::default()
                }
            }
        }
    }
}
