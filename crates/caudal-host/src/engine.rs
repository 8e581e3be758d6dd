//! Engine handle: audio exchange and live control over a shared server.

use crate::{Error, Result};
use caudal_core::{EngineConfig, MidiEvent, Server};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};

/// Shared handle over a running engine.
///
/// Clones share the same server. All audio and control entry points lock
/// the server for the duration of the call, so a control thread and the
/// audio callback can hold handles concurrently; a tick is never observed
/// half-done.
#[derive(Clone)]
pub struct Engine {
    server: Arc<Mutex<Server>>,
    channels: usize,
    buffer_size: usize,
    analog_channels: usize,
}

impl Engine {
    /// Boots an engine for the given hardware layout.
    ///
    /// `analog_channels` control lines are appended after the audio input
    /// channels in the engine's input layout.
    pub fn setup(
        channels: usize,
        buffer_size: usize,
        sample_rate: f32,
        analog_channels: usize,
    ) -> Self {
        info!(channels, buffer_size, sample_rate, analog_channels, "engine setup");
        let config = EngineConfig::new(sample_rate, buffer_size, channels);
        Self {
            server: Arc::new(Mutex::new(Server::with_analog(config, analog_channels))),
            channels,
            buffer_size,
            analog_channels,
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Server> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with exclusive access to the underlying server.
    ///
    /// This is the escape hatch for graph construction: register nodes,
    /// start streams, route outputs.
    pub fn with_server<R>(&self, f: impl FnOnce(&mut Server) -> R) -> R {
        f(&mut self.lock())
    }

    /// Number of audio channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Samples per channel per tick.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of trailing analog/control channels.
    pub fn analog_channels(&self) -> usize {
        self.analog_channels
    }

    /// Reconfigures sample rate and buffer size between ticks.
    pub fn configure(&mut self, sample_rate: f32, buffer_size: usize) {
        info!(sample_rate, buffer_size, "engine reconfigure");
        self.buffer_size = buffer_size;
        self.lock().configure(sample_rate, buffer_size);
    }

    /// Samples one host audio buffer holds for this layout.
    ///
    /// 2- and 4-channel layouts interleave one frame per engine sample.
    /// 8-channel boards clock their converters at twice the sample rate,
    /// so the host buffer carries two interleaved frames per engine
    /// sample and every engine sample occupies a frame pair.
    fn host_samples(&self) -> usize {
        if self.channels == 8 {
            self.buffer_size * self.channels * 2
        } else {
            self.buffer_size * self.channels
        }
    }

    fn check_len(&self, got: usize, expected: usize) -> Result<()> {
        if got == expected {
            Ok(())
        } else {
            Err(Error::BufferLayout { expected, got })
        }
    }

    /// Deinterleaves host audio input into the engine's input channels.
    ///
    /// For 8-channel boards each engine sample spans a doubled frame pair;
    /// the first frame of every pair is taken.
    pub fn fill_input(&self, host: &[f32]) -> Result<()> {
        self.check_len(host.len(), self.host_samples())?;
        let mut server = self.lock();
        let n = self.channels;
        if n == 8 {
            for c in 0..n {
                if let Some(buf) = server.input_channel_mut(c) {
                    for (i, y) in buf.iter_mut().enumerate() {
                        *y = host[2 * i * n + c];
                    }
                }
            }
        } else {
            for c in 0..n {
                if let Some(buf) = server.input_channel_mut(c) {
                    for (i, y) in buf.iter_mut().enumerate() {
                        *y = host[i * n + c];
                    }
                }
            }
        }
        Ok(())
    }

    /// Deinterleaves host analog/control input into the trailing input
    /// channels, after the audio channels.
    pub fn fill_analog(&self, host: &[f32]) -> Result<()> {
        let n = self.analog_channels;
        self.check_len(host.len(), self.buffer_size * n)?;
        let mut server = self.lock();
        for c in 0..n {
            if let Some(buf) = server.input_channel_mut(self.channels + c) {
                for (i, y) in buf.iter_mut().enumerate() {
                    *y = host[i * n + c];
                }
            }
        }
        Ok(())
    }

    /// Executes one tick and interleaves the engine output into `host`.
    ///
    /// For 8-channel boards each engine sample is written to both frames
    /// of its doubled pair.
    pub fn process(&self, host: &mut [f32]) -> Result<()> {
        self.check_len(host.len(), self.host_samples())?;
        let mut server = self.lock();
        server.tick();
        let n = self.channels;
        if n == 8 {
            for c in 0..n {
                for (i, &x) in server.output_channel(c).iter().enumerate() {
                    host[2 * i * n + c] = x;
                    host[(2 * i + 1) * n + c] = x;
                }
            }
        } else {
            for c in 0..n {
                for (i, &x) in server.output_channel(c).iter().enumerate() {
                    host[i * n + c] = x;
                }
            }
        }
        Ok(())
    }

    /// Interleaves the trailing `analog_channels` output channels of the
    /// last tick into `host`, mirroring [`Engine::fill_analog`].
    ///
    /// Analog lines beyond the audio channel count have no backing output
    /// channel and carry zero.
    pub fn analog_out(&self, host: &mut [f32]) -> Result<()> {
        let n = self.analog_channels;
        self.check_len(host.len(), self.buffer_size * n)?;
        let server = self.lock();
        for c in 0..n {
            match (self.channels + c).checked_sub(n) {
                Some(ch) => {
                    for (i, &x) in server.output_channel(ch).iter().enumerate() {
                        host[i * n + c] = x;
                    }
                }
                None => {
                    for i in 0..self.buffer_size {
                        host[i * n + c] = 0.0;
                    }
                }
            }
        }
        Ok(())
    }

    /// Assigns the `value` attribute of a named node.
    pub fn set_value(&self, name: &str, values: &[f32]) -> Result<()> {
        self.lock().set_value(name, values)?;
        Ok(())
    }

    /// Assigns a node attribute through a `name.attribute` path.
    pub fn set_attribute(&self, path: &str, values: &[f32]) -> Result<()> {
        let Some((name, attr)) = path.split_once('.') else {
            return Err(Error::AttributePath(path.to_string()));
        };
        if name.is_empty() || attr.is_empty() {
            return Err(Error::AttributePath(path.to_string()));
        }
        if let Err(e) = self.lock().set_attribute(name, attr, values) {
            warn!(path, %e, "attribute rejected");
            return Err(e.into());
        }
        Ok(())
    }

    /// Enqueues a raw MIDI triplet for the next tick.
    pub fn push_midi_event(&self, status: u8, data1: u8, data2: u8) {
        self.lock().push_midi(MidiEvent {
            status,
            data1,
            data2,
        });
    }
}
