//! Engine-wide audio configuration.
//!
//! An [`EngineConfig`] bundles the three quantities every part of the engine
//! needs: sample rate, buffer size, and hardware channel count. The `Server`
//! owns the authoritative copy; nodes receive it at construction and again
//! through [`Node::configure`](crate::Node::configure) when the server is
//! reconfigured between ticks.

/// Global audio configuration for one engine instance.
///
/// One tick computes `buffer_size` samples for every registered stream, so a
/// tick lasts `buffer_size / sample_rate` seconds of audio time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g., 44100.0, 48000.0).
    pub sample_rate: f32,
    /// Samples per stream buffer per tick.
    pub buffer_size: usize,
    /// Hardware output channel count.
    pub channels: usize,
}

impl EngineConfig {
    /// Creates a configuration from its three components.
    pub fn new(sample_rate: f32, buffer_size: usize, channels: usize) -> Self {
        Self {
            sample_rate,
            buffer_size,
            channels,
        }
    }

    /// Duration of one tick in seconds.
    pub fn tick_seconds(&self) -> f32 {
        self.buffer_size as f32 / self.sample_rate
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100.0,
            buffer_size: 256,
            channels: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_duration() {
        let cfg = EngineConfig::new(48000.0, 480, 2);
        assert!((cfg.tick_seconds() - 0.01).abs() < 1e-7);
    }
}
