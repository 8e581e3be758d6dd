//! Mono ring-buffer delay line.
//!
//! The building block for the waveguide reverb network: a heap-allocated
//! circular buffer with integer reads for fixed taps and linearly
//! interpolated fractional reads for micro-modulated line lengths. The
//! buffer is allocated at construction (control path) and never grows
//! during processing.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Circular delay line with fractional read support.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// Creates a delay line able to hold `max_delay_samples` samples.
    ///
    /// # Panics
    ///
    /// Panics if `max_delay_samples` is 0.
    pub fn new(max_delay_samples: usize) -> Self {
        assert!(max_delay_samples > 0, "delay line length must be > 0");
        Self {
            buffer: vec![0.0; max_delay_samples],
            write_pos: 0,
        }
    }

    /// Maximum delay in samples.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Writes one sample and advances the write position.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos += 1;
        if self.write_pos == self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Reads the sample written `delay` samples ago (1 = most recent).
    #[inline]
    pub fn read(&self, delay: usize) -> f32 {
        let len = self.buffer.len();
        let d = delay.clamp(1, len);
        let pos = (self.write_pos + len - d) % len;
        self.buffer[pos]
    }

    /// Reads with a fractional delay using linear interpolation.
    ///
    /// `delay` is clamped to `[1, capacity - 1]` so both taps stay inside
    /// the buffer.
    #[inline]
    pub fn read_frac(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let d = delay.clamp(1.0, (len - 1) as f32);
        let d_int = d as usize;
        let frac = d - d_int as f32;
        let a = self.read(d_int);
        let b = self.read(d_int + 1);
        a + (b - a) * frac
    }

    /// Clears the line to silence.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
