//! Filter Node Trait
//!
//! Base interface that every node in a filter graph implements. Nodes work on
//! interleaved f32 samples and may return more or fewer samples than they
//! receive.

mod biquad;
mod endpoint;
mod gain;
mod resample;
mod tempo;

pub use biquad::{BiquadKind, BiquadNode};
pub use endpoint::Endpoint;
pub use gain::{NullNode, VolumeNode};
pub use resample::ResampleNode;
pub use tempo::TempoNode;

use crate::resampling::ResamplingQuality;
use audx_core::Result;

/// Stream properties at a node's input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeContext {
    /// Sample rate entering the node
    pub sample_rate: u32,
    /// Channel count entering the node
    pub channels: usize,
    /// Quality for nodes that resample
    pub resampling_quality: ResamplingQuality,
}

/// A processing step inside a filter graph
///
/// # Implementation Requirements
/// 1. `process()` consumes interleaved samples and returns whatever output is ready
/// 2. `flush()` returns everything still held once input has ended
/// 3. `output_rate()` reports the sample rate the node produces
pub trait FilterNode: Send {
    /// Registered name of the node type
    fn name(&self) -> &'static str;

    /// Sample rate of the node's output for a given input rate
    fn output_rate(&self, input_rate: u32) -> u32 {
        input_rate
    }

    /// Process interleaved samples
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Drain buffered output at end of stream
    fn flush(&mut self) -> Result<Vec<f32>> {
        Ok(Vec::new())
    }
}
