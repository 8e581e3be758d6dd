//! Caudal Nodes - the DSP node library.
//!
//! Every type here implements the [`Node`](caudal_core::Node) contract from
//! `caudal-core` and is driven by a `Server`: sources ([`Sig`], [`Sine`],
//! [`Noise`], [`InputTap`]), envelope generators ([`Fader`], [`Adsr`],
//! [`Linseg`], [`Expseg`]), the waveguide reverb network ([`WgVerb`] and the
//! stereo [`st_reverb`]), the band-splitting filter banks ([`band_splitter`]
//! and [`four_band`]), and the [`Yin`] pitch tracker.
//!
//! Nodes with several output streams (stereo reverb, filter banks) are
//! realized as a shared core behind a mutex plus one lightweight tap node
//! per output; the core computes all channels once per tick, whichever tap
//! the server happens to run first. These constructors are `std`-only; the
//! single-output nodes are `no_std`-compatible like the engine itself.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod adsr;
#[cfg(feature = "std")]
pub mod bandsplit;
pub mod expseg;
pub mod fader;
#[cfg(feature = "std")]
pub mod fourband;
pub mod input;
pub mod linseg;
pub mod noise;
pub mod osc;
pub mod sig;
#[cfg(feature = "std")]
pub mod streverb;
pub mod wgverb;
pub mod yin;

mod param;

pub use adsr::Adsr;
#[cfg(feature = "std")]
pub use bandsplit::{BandTap, band_splitter};
pub use expseg::Expseg;
pub use fader::Fader;
#[cfg(feature = "std")]
pub use fourband::{FourBandTap, four_band};
pub use input::InputTap;
pub use linseg::Linseg;
pub use noise::Noise;
pub use osc::Sine;
pub use sig::Sig;
#[cfg(feature = "std")]
pub use streverb::{StReverbTap, st_reverb};
pub use wgverb::WgVerb;
pub use yin::Yin;
