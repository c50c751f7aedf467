//! Sample FIFO and timestamp counter for the encode adapter

use audx_core::{AudxError, Result};
use std::collections::VecDeque;

/// Unbounded queue of interleaved samples, dequeued in arrival order
#[derive(Debug, Clone)]
pub struct SampleFifo {
    bytes_per_frame: usize,
    buffer: VecDeque<u8>,
}

impl SampleFifo {
    /// Create a FIFO for samples of `bytes_per_frame` bytes (all channels)
    pub fn new(bytes_per_frame: usize) -> Self {
        Self {
            bytes_per_frame: bytes_per_frame.max(1),
            buffer: VecDeque::new(),
        }
    }

    /// Samples per channel currently queued
    pub fn len(&self) -> usize {
        self.buffer.len() / self.bytes_per_frame
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Append whole samples, returning the number written
    ///
    /// Anything short of the full offer is a [`AudxError::FifoWrite`].
    pub fn write(&mut self, bytes: &[u8]) -> Result<usize> {
        let offered = bytes.len() / self.bytes_per_frame;
        if bytes.len() % self.bytes_per_frame != 0 {
            return Err(AudxError::FifoWrite {
                offered,
                accepted: 0,
            });
        }
        if self.buffer.try_reserve(bytes.len()).is_err() {
            return Err(AudxError::FifoWrite {
                offered,
                accepted: 0,
            });
        }
        self.buffer.extend(bytes);
        Ok(offered)
    }

    /// Dequeue up to `samples` samples
    pub fn read(&mut self, samples: usize) -> Vec<u8> {
        let take = samples.min(self.len()) * self.bytes_per_frame;
        self.buffer.drain(..take).collect()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// Presentation index of the next frame sent to an encoder
///
/// Never decreases and is never reset during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimestampCounter {
    next: i64,
}

impl TimestampCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp a frame of `samples` samples and move past it
    pub fn advance(&mut self, samples: usize) -> i64 {
        let pts = self.next;
        self.next = self.next.saturating_add(samples as i64);
        pts
    }

    /// Total samples stamped so far
    pub fn value(&self) -> i64 {
        self.next
    }
}
