//! The Server: process-wide engine context and tick driver.
//!
//! A [`Server`] owns the configuration, the registry of live streams, the
//! deinterleaved hardware input buffers, and the hardware output
//! accumulator. One call to [`Server::tick`] computes one buffer for every
//! registered stream, in registration order, and mixes every routed stream
//! into its output channel.
//!
//! # Execution model
//!
//! Single-threaded and cooperative: `tick()` runs synchronously (typically
//! on the host's audio callback), performs no allocation, no I/O, and no
//! blocking. All graph mutation — registration, rebinding, scheduling calls,
//! reconfiguration — happens on the control path between ticks; embedders
//! serialize the two with an engine lock around the whole `Server` (see the
//! host crate). Registration order is the tick execution order and is
//! entirely caller-determined: a consumer registered before its producer
//! reads the producer's previous block, which is stale by one tick, not an
//! error.
//!
//! Multiple servers coexist in one process with fully isolated registries,
//! ids, and buffers.

#[cfg(not(feature = "std"))]
use alloc::{
    boxed::Box,
    collections::BTreeMap,
    string::{String, ToString},
    vec,
    vec::Vec,
};
#[cfg(feature = "std")]
use std::collections::BTreeMap;

use crate::binding::Param;
use crate::config::EngineConfig;
use crate::node::{AttrError, Node};
use crate::stream::{Stream, StreamId};

/// A raw MIDI triplet queued for polling nodes.
///
/// Events pushed from the control path are visible to every node for
/// exactly one tick, then discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiEvent {
    /// Status byte (message type + channel).
    pub status: u8,
    /// First data byte.
    pub data1: u8,
    /// Second data byte.
    pub data2: u8,
}

/// Control-path error from server operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// No registered stream with this id.
    UnknownStream(StreamId),
    /// No registered stream with this name.
    UnknownName(String),
    /// The target node rejected the attribute.
    Attr(AttrError),
}

impl core::fmt::Display for ServerError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ServerError::UnknownStream(id) => write!(f, "unknown stream id {}", id.index()),
            ServerError::UnknownName(name) => write!(f, "unknown stream name {name:?}"),
            ServerError::Attr(e) => write!(f, "attribute error: {e}"),
        }
    }
}

impl From<AttrError> for ServerError {
    fn from(e: AttrError) -> Self {
        ServerError::Attr(e)
    }
}

pub(crate) struct Slot {
    pub(crate) stream: Stream,
    /// Taken out for the duration of the slot's own compute call.
    pub(crate) node: Option<Box<dyn Node>>,
}

/// Read-only view of the engine for the duration of one compute call.
///
/// Resolves stream references to their most recently computed buffers and
/// exposes hardware input, configuration, and the per-tick MIDI queue.
/// A reference to a stream that does not exist (or whose buffer is the one
/// currently being computed) resolves to silence.
pub struct Tick<'a> {
    slots: &'a [Option<Slot>],
    input: &'a [Vec<f32>],
    midi: &'a [MidiEvent],
    silence: &'a [f32],
    config: &'a EngineConfig,
    count: u64,
}

impl<'a> Tick<'a> {
    /// Most recently computed sample buffer of the given stream.
    #[inline]
    pub fn stream(&self, id: StreamId) -> &'a [f32] {
        match self.slots.get(id.index() as usize).and_then(Option::as_ref) {
            Some(slot) if slot.stream.data.len() == self.config.buffer_size => &slot.stream.data,
            _ => self.silence,
        }
    }

    /// Trigger buffer of the given stream for this tick.
    #[inline]
    pub fn trigger(&self, id: StreamId) -> &'a [f32] {
        match self.slots.get(id.index() as usize).and_then(Option::as_ref) {
            Some(slot) if slot.stream.trigger.data().len() == self.config.buffer_size => {
                slot.stream.trigger.data()
            }
            _ => self.silence,
        }
    }

    /// Resolves a streaming parameter to its producer's buffer.
    ///
    /// Intended for kernels selected for the streaming variant; a constant
    /// binding resolves to silence.
    #[inline]
    pub fn stream_param(&self, param: &Param) -> &'a [f32] {
        match param {
            Param::Stream(id) => self.stream(*id),
            Param::Constant(_) => self.silence,
        }
    }

    /// Deinterleaved hardware input channel (audio first, then analog).
    #[inline]
    pub fn input_channel(&self, channel: usize) -> &'a [f32] {
        match self.input.get(channel) {
            Some(buf) if buf.len() == self.config.buffer_size => buf,
            _ => self.silence,
        }
    }

    /// Engine configuration in effect for this tick.
    pub fn config(&self) -> &EngineConfig {
        self.config
    }

    /// Sample rate in Hz.
    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.config.sample_rate
    }

    /// Samples per buffer.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    /// MIDI events queued since the previous tick.
    pub fn midi(&self) -> &'a [MidiEvent] {
        self.midi
    }

    /// Monotonic tick counter (first tick is 1).
    pub fn count(&self) -> u64 {
        self.count
    }
}

/// Process-wide engine context: registry, tick driver, and output mix.
pub struct Server {
    config: EngineConfig,
    analog_channels: usize,
    slots: Vec<Option<Slot>>,
    /// Live stream ids in registration order — the tick execution order.
    order: Vec<StreamId>,
    names: BTreeMap<String, StreamId>,
    /// Deinterleaved hardware input: audio channels, then analog channels.
    input: Vec<Vec<f32>>,
    /// Planar hardware output accumulator, `channels * buffer_size`.
    output: Vec<f32>,
    silence: Vec<f32>,
    midi: Vec<MidiEvent>,
    ticks: u64,
}

impl Server {
    /// Creates a server with no analog channels.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_analog(config, 0)
    }

    /// Creates a server with `analog_channels` control inputs appended
    /// after the audio input channels.
    pub fn with_analog(config: EngineConfig, analog_channels: usize) -> Self {
        let bs = config.buffer_size;
        Self {
            config,
            analog_channels,
            slots: Vec::new(),
            order: Vec::new(),
            names: BTreeMap::new(),
            input: (0..config.channels + analog_channels)
                .map(|_| vec![0.0; bs])
                .collect(),
            output: vec![0.0; config.channels * bs],
            silence: vec![0.0; bs],
            midi: Vec::new(),
            ticks: 0,
        }
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of analog input channels.
    pub fn analog_channels(&self) -> usize {
        self.analog_channels
    }

    /// Number of ticks executed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // --- Registry ---

    /// Registers a node, appending its stream to the execution order.
    pub fn register(&mut self, node: Box<dyn Node>) -> StreamId {
        let id = StreamId(self.slots.len() as u32);
        self.slots.push(Some(Slot {
            stream: Stream::new(id, self.config.buffer_size),
            node: Some(node),
        }));
        self.order.push(id);
        id
    }

    /// Registers a node under a control-path name.
    ///
    /// A later registration with the same name shadows the earlier one.
    pub fn register_named(&mut self, name: &str, node: Box<dyn Node>) -> StreamId {
        let id = self.register(node);
        self.names.insert(name.to_string(), id);
        id
    }

    /// Unregisters a stream, returning its node.
    ///
    /// The id is never reused. Bindings still pointing at it resolve to
    /// silence from the next tick on.
    pub fn unregister(&mut self, id: StreamId) -> Option<Box<dyn Node>> {
        let slot = self.slots.get_mut(id.index() as usize)?.take()?;
        self.order.retain(|&x| x != id);
        self.names.retain(|_, &mut v| v != id);
        slot.node
    }

    /// Removes every registered stream and name.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.order.clear();
        self.names.clear();
    }

    /// Number of live registered streams.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if no stream is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Resolves a control-path name.
    pub fn lookup(&self, name: &str) -> Option<StreamId> {
        self.names.get(name).copied()
    }

    /// Read access to a registered stream.
    pub fn stream(&self, id: StreamId) -> Option<&Stream> {
        self.slots
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .map(|slot| &slot.stream)
    }

    /// Mutable access to a registered node (control path).
    pub fn node_mut(&mut self, id: StreamId) -> Option<&mut (dyn Node + '_)> {
        let slot = self.slots.get_mut(id.index() as usize)?.as_mut()?;
        let node = slot.node.as_deref_mut()?;
        Some(node)
    }

    // --- Scheduling ---

    /// Starts a stream without routing it to hardware output.
    pub fn play(&mut self, id: StreamId, duration: f32, delay: f32) -> Result<(), ServerError> {
        let config = self.config;
        let slot = self.slot_mut(id)?;
        slot.stream.scheduler.play(&config, duration, delay);
        Ok(())
    }

    /// Starts a stream routed to `channel % channels`.
    pub fn out(
        &mut self,
        id: StreamId,
        channel: usize,
        duration: f32,
        delay: f32,
    ) -> Result<(), ServerError> {
        let config = self.config;
        let slot = self.slot_mut(id)?;
        slot.stream.scheduler.out(&config, channel, duration, delay);
        Ok(())
    }

    /// Stops a stream, immediately or after `wait` seconds of ticks.
    ///
    /// A deferred stop also notifies the node (`on_stop`) so fade-style
    /// nodes can launch their release curve.
    pub fn stop(&mut self, id: StreamId, wait: f32) -> Result<(), ServerError> {
        let config = self.config;
        let deferred = crate::math::duration_ticks(wait, &config) > 0;
        let slot = self.slot_mut(id)?;
        if deferred {
            if let Some(node) = slot.node.as_deref_mut() {
                node.on_stop();
            }
        }
        slot.stream.scheduler.stop(&config, wait);
        Ok(())
    }

    // --- Control path ---

    /// Assigns the `value` attribute of a named node.
    pub fn set_value(&mut self, name: &str, values: &[f32]) -> Result<(), ServerError> {
        self.set_attribute(name, "value", values)
    }

    /// Assigns a named node's attribute.
    pub fn set_attribute(
        &mut self,
        name: &str,
        attr: &str,
        values: &[f32],
    ) -> Result<(), ServerError> {
        let id = self
            .lookup(name)
            .ok_or_else(|| ServerError::UnknownName(name.to_string()))?;
        let node = self
            .node_mut(id)
            .ok_or(ServerError::UnknownStream(id))?;
        node.set_attribute(attr, values)?;
        Ok(())
    }

    /// Enqueues a raw MIDI triplet for the next tick.
    pub fn push_midi(&mut self, event: MidiEvent) {
        self.midi.push(event);
    }

    /// Mutable hardware input channel, for the host to fill before a tick.
    pub fn input_channel_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        self.input.get_mut(channel).map(Vec::as_mut_slice)
    }

    /// Planar hardware output computed by the last tick.
    pub fn output(&self) -> &[f32] {
        &self.output
    }

    /// One channel's region of the hardware output.
    pub fn output_channel(&self, channel: usize) -> &[f32] {
        let bs = self.config.buffer_size;
        let base = channel * bs;
        &self.output[base..base + bs]
    }

    /// Reconfigures sample rate and buffer size between ticks.
    ///
    /// Reallocates every stream buffer and notifies every node. Must never
    /// be called while a tick is in flight (the engine lock guarantees
    /// this for embedders).
    pub fn configure(&mut self, sample_rate: f32, buffer_size: usize) {
        self.config.sample_rate = sample_rate;
        self.config.buffer_size = buffer_size;
        let config = self.config;
        self.silence.clear();
        self.silence.resize(buffer_size, 0.0);
        self.output.clear();
        self.output.resize(config.channels * buffer_size, 0.0);
        for buf in &mut self.input {
            buf.clear();
            buf.resize(buffer_size, 0.0);
        }
        for slot in self.slots.iter_mut().flatten() {
            slot.stream.resize(buffer_size);
            if let Some(node) = slot.node.as_deref_mut() {
                node.configure(&config);
            }
        }
    }

    // --- Tick ---

    /// Executes one engine tick.
    ///
    /// For each stream in registration order: advance its scheduler, zero
    /// its buffer on silent-entry ticks, otherwise run the primary kernel
    /// followed by the post-processing kernel. Then accumulate every routed
    /// stream into its output channel and drop this tick's MIDI events.
    pub fn tick(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        let count = self.ticks;
        self.output.fill(0.0);
        for slot in self.slots.iter_mut().flatten() {
            slot.stream.trigger.clear();
        }

        for i in 0..self.order.len() {
            let id = self.order[i];
            let Some(slot) = self
                .slots
                .get_mut(id.index() as usize)
                .and_then(Option::as_mut)
            else {
                continue;
            };
            if slot.stream.computed_tick == Some(count) {
                continue;
            }
            slot.stream.computed_tick = Some(count);

            let plan = slot.stream.scheduler.advance();
            if plan.end_pulse {
                slot.stream.trigger.fire(0);
            }
            if plan.zero {
                slot.stream.data.fill(0.0);
            }
            if !plan.run {
                continue;
            }

            let Some(mut node) = slot.node.take() else {
                continue;
            };
            let mut data = core::mem::take(&mut slot.stream.data);
            let mut trig = core::mem::take(&mut slot.stream.trigger.data);

            {
                let view = Tick {
                    slots: &self.slots,
                    input: &self.input,
                    midi: &self.midi,
                    silence: &self.silence,
                    config: &self.config,
                    count,
                };
                if plan.activated {
                    node.on_play();
                }
                node.compute(&view, &mut data, &mut trig);
                node.post().apply(&view, &mut data);
            }

            if let Some(slot) = self
                .slots
                .get_mut(id.index() as usize)
                .and_then(Option::as_mut)
            {
                slot.stream.data = data;
                slot.stream.trigger.data = trig;
                slot.node = Some(node);
            }
        }

        // Mix routed streams into the hardware output (sum, not overwrite).
        let bs = self.config.buffer_size;
        for slot in self.slots.iter().flatten() {
            let Some(channel) = slot.stream.scheduler.route() else {
                continue;
            };
            let base = channel * bs;
            for (out, &sample) in self.output[base..base + bs]
                .iter_mut()
                .zip(slot.stream.data.iter())
            {
                *out += sample;
            }
        }

        self.midi.clear();
    }

    fn slot_mut(&mut self, id: StreamId) -> Result<&mut Slot, ServerError> {
        self.slots
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .ok_or(ServerError::UnknownStream(id))
    }
}
