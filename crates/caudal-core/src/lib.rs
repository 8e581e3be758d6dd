//! Caudal Core - buffer-synchronous DSP engine.
//!
//! A graph of computation nodes, each producing one fixed-size block of
//! samples per engine tick, composed by consumers that read each other's
//! output blocks. Designed for real-time embedding inside a host audio
//! callback: the tick path performs no allocation, no I/O, and no blocking.
//!
//! # Core Abstractions
//!
//! ## Execution
//!
//! - [`Server`] - process-wide context: configuration, stream registry,
//!   tick driver, and hardware output mix
//! - [`Node`] - the contract every DSP unit implements
//! - [`Tick`] - the read-only per-tick view nodes resolve their inputs
//!   through
//!
//! ## Data
//!
//! - [`Stream`] / [`StreamId`] - a node's output block plus routing and
//!   scheduling metadata
//! - [`TriggerStream`] - sparse 0/1 event buffer, cleared every tick
//! - [`Param`] - constant-or-stream parameter binding; rebinding selects a
//!   specialized kernel so hot loops never test the variant
//! - [`PostFx`] - the uniform `mul * x + add` post-processing stage with
//!   its nine specialized kernels
//! - [`Scheduler`] - play/out/stop state machine with buffer-quantized
//!   delay and duration
//!
//! ## DSP primitives
//!
//! - [`DelayLine`] - ring buffer with fractional reads (waveguides)
//! - [`OnePole`] - one-pole lowpass (damping, prefiltering)
//! - [`Biquad`] / [`BiquadCoeffs`] - second-order sections (filter banks)
//!
//! # Concurrency
//!
//! One tick executes synchronously on the audio thread. All mutation
//! (registration, rebinding, scheduling, reconfiguration) belongs to the
//! control path; embedders serialize the two by wrapping the `Server` in a
//! mutex — see the `caudal-host` crate. Several servers can coexist in one
//! process without sharing any state.
//!
//! # no_std Support
//!
//! `no_std` compatible (with `alloc`) for embedded targets; disable the
//! default `std` feature. Math goes through `libm`.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod binding;
pub mod biquad;
pub mod config;
pub mod delay;
pub mod math;
pub mod node;
pub mod one_pole;
pub mod postfx;
pub mod schedule;
pub mod server;
pub mod stream;

pub use binding::Param;
pub use biquad::{Biquad, BiquadCoeffs};
pub use config::EngineConfig;
pub use delay::DelayLine;
pub use math::{DIV_EPSILON, clamp_magnitude, delay_ticks, duration_ticks, flush_denormal};
pub use node::{AttrError, Node};
pub use one_pole::OnePole;
pub use postfx::PostFx;
pub use schedule::{PlayState, Scheduler, TickPlan};
pub use server::{MidiEvent, Server, ServerError, Tick};
pub use stream::{Stream, StreamId, TriggerStream};
