//! Filter Stage
//!
//! A linear graph of [`FilterNode`]s between an `abuffer` source and an
//! `abuffersink` sink. Frames are pushed in, and output frames are pulled
//! until the graph reports [`PullOutcome::NeedMoreInput`]:
//!
//! ```
//! use audx_audio::filter::{FilterGraph, FilterSettings, PullOutcome};
//! use audx_core::{AudioFormat, AudioFrame};
//!
//! let format = AudioFormat::cd_quality();
//! let mut graph = FilterGraph::init(format, "volume=0.5", FilterSettings::default()).unwrap();
//!
//! let frame = AudioFrame::new(vec![0u8; 4 * 100], format, 100, 0).unwrap();
//! graph.push(&frame).unwrap();
//! let mut pulled = 0;
//! while let PullOutcome::Frame(out) = graph.pull().unwrap() {
//!     pulled += out.sample_count();
//! }
//! assert_eq!(pulled, 100);
//! ```

pub mod nodes;
pub mod parser;
pub mod registry;

pub use nodes::{FilterNode, NodeContext};
pub use parser::{parse_chain, FilterArgs};
pub use registry::{FilterFactory, FilterRegistry};

use crate::conversion::sample;
use crate::resampling::ResamplingQuality;
use audx_core::{AudioFormat, AudioFrame, AudxError, Result};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Most channels a graph accepts
pub const MAX_GRAPH_CHANNELS: usize = 8;

/// Default upper bound on samples per pulled frame
pub const DEFAULT_MAX_FRAME_SAMPLES: usize = 1024;

/// Graph construction settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSettings {
    /// Upper bound on samples per pulled frame
    pub max_frame_samples: usize,
    /// Quality for `aresample`
    pub resampling_quality: ResamplingQuality,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            max_frame_samples: DEFAULT_MAX_FRAME_SAMPLES,
            resampling_quality: ResamplingQuality::default(),
        }
    }
}

/// Result of [`FilterGraph::pull`]
#[derive(Debug)]
pub enum PullOutcome {
    /// One output frame
    Frame(AudioFrame),
    /// Nothing ready; push more input
    NeedMoreInput,
    /// The end-of-stream marker has been pushed and all output drained
    EndOfStream,
}

/// An initialised filter graph
pub struct FilterGraph {
    nodes: Vec<Box<dyn FilterNode>>,
    input_format: AudioFormat,
    output_format: AudioFormat,
    max_frame_samples: usize,
    /// Interleaved f32 samples waiting at the sink
    ready: VecDeque<f32>,
    eof: bool,
    next_pts: i64,
}

impl FilterGraph {
    /// Build a graph for `chain` with the built-in node types
    pub fn init(format: AudioFormat, chain: &str, settings: FilterSettings) -> Result<Self> {
        Self::with_registry(&FilterRegistry::with_builtin_filters(), format, chain, settings)
    }

    /// Build a graph for `chain` from the node types in `registry`
    pub fn with_registry(
        registry: &FilterRegistry,
        format: AudioFormat,
        chain: &str,
        settings: FilterSettings,
    ) -> Result<Self> {
        if format.layout.is_empty() {
            return Err(AudxError::InvalidFormat(
                "filter input has an empty channel layout".to_string(),
            ));
        }
        if format.sample_format.name().is_none() {
            return Err(AudxError::UnsupportedFormat(format!(
                "sample format {:?} cannot enter a filter graph",
                format.sample_format
            )));
        }

        let source = registry
            .get(nodes::Endpoint::SOURCE)
            .ok_or_else(|| AudxError::FilterNotFound(nodes::Endpoint::SOURCE.to_string()))?;
        let sink = registry
            .get(nodes::Endpoint::SINK)
            .ok_or_else(|| AudxError::FilterNotFound(nodes::Endpoint::SINK.to_string()))?;

        let parsed = parse_chain(chain)?;
        if let Some(unknown) = parsed.iter().find(|f| !registry.contains(&f.name)) {
            return Err(AudxError::GraphParse(format!(
                "no such filter: '{}'",
                unknown.name
            )));
        }

        let channels = format.channels();
        if channels > MAX_GRAPH_CHANNELS {
            return Err(AudxError::GraphConfig(format!(
                "{} channels not supported (at most {})",
                channels, MAX_GRAPH_CHANNELS
            )));
        }
        if settings.max_frame_samples == 0 {
            return Err(AudxError::GraphConfig(
                "max_frame_samples must be positive".to_string(),
            ));
        }

        let mut ctx = NodeContext {
            sample_rate: format.sample_rate,
            channels,
            resampling_quality: settings.resampling_quality,
        };

        let mut graph_nodes: Vec<Box<dyn FilterNode>> = Vec::with_capacity(parsed.len() + 2);
        graph_nodes.push((source.create)(&FilterArgs::bare(source.name), &ctx)?);
        for args in &parsed {
            // Checked above
            let Some(factory) = registry.get(&args.name) else {
                continue;
            };
            let node = (factory.create)(args, &ctx)?;
            ctx.sample_rate = node.output_rate(ctx.sample_rate);
            graph_nodes.push(node);
        }
        graph_nodes.push((sink.create)(&FilterArgs::bare(sink.name), &ctx)?);

        let output_format = format.with_sample_rate(ctx.sample_rate);
        debug!(
            chain = %chain,
            input = %format,
            output = %output_format,
            "Filter graph configured"
        );

        Ok(Self {
            nodes: graph_nodes,
            input_format: format,
            output_format,
            max_frame_samples: settings.max_frame_samples,
            ready: VecDeque::new(),
            eof: false,
            next_pts: 0,
        })
    }

    /// Format frames must have when pushed
    pub fn input_format(&self) -> AudioFormat {
        self.input_format
    }

    /// Format of pulled frames
    pub fn output_format(&self) -> AudioFormat {
        self.output_format
    }

    /// Node names from source to sink
    pub fn node_names(&self) -> Vec<&'static str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    /// Feed one frame; the caller keeps ownership
    pub fn push(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.eof {
            return Err(AudxError::invalid_state(
                "frame pushed after end of stream",
            ));
        }
        if frame.format() != self.input_format {
            return Err(AudxError::Graph(format!(
                "frame format {} does not match graph input {}",
                frame.format(),
                self.input_format
            )));
        }

        let mut samples = sample::decode(frame.as_bytes(), self.input_format.sample_format);
        for node in &mut self.nodes {
            samples = node.process(&samples)?;
        }
        trace!(
            pushed = frame.sample_count(),
            ready = samples.len() / self.output_format.channels(),
            "Filter push"
        );
        self.ready.extend(samples);
        Ok(())
    }

    /// Signal end of stream and drain every node
    pub fn push_eof(&mut self) -> Result<()> {
        if self.eof {
            return Err(AudxError::invalid_state("end of stream pushed twice"));
        }
        self.eof = true;

        // Each node's tail passes through every node after it
        for i in 0..self.nodes.len() {
            let mut tail = self.nodes[i].flush()?;
            for node in &mut self.nodes[i + 1..] {
                tail = node.process(&tail)?;
            }
            self.ready.extend(tail);
        }
        debug!(pending = self.ready.len(), "Filter graph drained");
        Ok(())
    }

    /// Take the next output frame
    pub fn pull(&mut self) -> Result<PullOutcome> {
        let channels = self.output_format.channels();
        let available = self.ready.len() / channels;

        if available == 0 {
            return Ok(if self.eof {
                PullOutcome::EndOfStream
            } else {
                PullOutcome::NeedMoreInput
            });
        }

        let count = available.min(self.max_frame_samples);
        let samples: Vec<f32> = self.ready.drain(..count * channels).collect();
        let data = sample::encode(&samples, self.output_format.sample_format);
        let frame = AudioFrame::new(data, self.output_format, count, self.next_pts)?;
        self.next_pts += count as i64;
        Ok(PullOutcome::Frame(frame))
    }
}

impl std::fmt::Debug for FilterGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterGraph")
            .field("nodes", &self.node_names())
            .field("input_format", &self.input_format)
            .field("output_format", &self.output_format)
            .field("eof", &self.eof)
            .finish()
    }
}
