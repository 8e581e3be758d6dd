//! Stream and trigger buffer objects.
//!
//! A [`Stream`] is the output buffer a node exposes to the rest of the
//! graph: one block of samples per tick, plus the routing and scheduling
//! metadata the server needs to drive it. Streams are owned by the server
//! registry; consumers refer to them by [`StreamId`] and read their sample
//! data through the per-tick [`Tick`](crate::Tick) view, never directly.
//!
//! A [`TriggerStream`] is the sparse companion buffer: a 0/1 pulse array the
//! same length as the sample buffer, cleared at the start of every tick.
//! The scheduler writes the end-of-duration pulse into it, and nodes with
//! discrete events (envelope completion, new pitch estimate) write their
//! own pulses during `compute`.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::schedule::Scheduler;

/// Identifier of a registered stream.
///
/// Assigned sequentially by a server and never reused within that server's
/// lifetime; ids from different servers are unrelated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub(crate) u32);

impl StreamId {
    /// Raw numeric id.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Per-sample 0/1 event buffer, cleared every tick.
///
/// Pulses mark discrete occurrences at sample resolution within a tick and
/// never accumulate across ticks.
#[derive(Debug, Clone)]
pub struct TriggerStream {
    pub(crate) data: Vec<f32>,
}

impl TriggerStream {
    /// Creates an all-zero trigger buffer of the given length.
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len],
        }
    }

    /// Clears every pulse. Called by the server at the start of each tick.
    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// Writes a pulse at the given sample index.
    pub fn fire(&mut self, sample: usize) {
        if let Some(slot) = self.data.get_mut(sample) {
            *slot = 1.0;
        }
    }

    /// Pulse data for this tick.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// True if any pulse fired this tick.
    pub fn any(&self) -> bool {
        self.data.iter().any(|&x| x != 0.0)
    }

    pub(crate) fn resize(&mut self, len: usize) {
        self.data.clear();
        self.data.resize(len, 0.0);
    }
}

/// The output buffer object owned by a registered node.
#[derive(Debug)]
pub struct Stream {
    id: StreamId,
    pub(crate) data: Vec<f32>,
    pub(crate) trigger: TriggerStream,
    pub(crate) scheduler: Scheduler,
    /// Idempotence guard: tick count at which this stream was last computed.
    pub(crate) computed_tick: Option<u64>,
}

impl Stream {
    pub(crate) fn new(id: StreamId, buffer_size: usize) -> Self {
        Self {
            id,
            data: vec![0.0; buffer_size],
            trigger: TriggerStream::new(buffer_size),
            scheduler: Scheduler::new(),
            computed_tick: None,
        }
    }

    /// This stream's id.
    pub fn id(&self) -> StreamId {
        self.id
    }

    /// Sample data most recently computed for this stream.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Companion trigger buffer.
    pub fn trigger(&self) -> &TriggerStream {
        &self.trigger
    }

    /// Scheduling state machine.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Output routing channel, if the stream is routed to hardware.
    pub fn route(&self) -> Option<usize> {
        self.scheduler.route()
    }

    pub(crate) fn resize(&mut self, buffer_size: usize) {
        self.data.clear();
        self.data.resize(buffer_size, 0.0);
        self.trigger.resize(buffer_size);
        self.computed_tick = None;
    }
}
