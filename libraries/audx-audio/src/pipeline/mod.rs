//! Pipeline Orchestrator
//!
//! One synchronous loop: decode, optionally filter, then encode or append raw
//! PCM. The orchestrator is the only component that knows whether filtering
//! and encoding are enabled.
//!
//! ```text
//! AudioSource -> [FilterGraph] -> EncodeAdapter -> Muxer
//!                              \-> raw PCM file
//! ```

mod state;

pub use state::{PipelineEvent, PipelineState, PipelineStateMachine};

use crate::decoder::{DecodeSettings, SymphoniaDecoder};
use crate::encoder::{parse_bitrate, EncodeAdapter, EncoderSettings, Quality};
use crate::filter::{FilterGraph, FilterSettings, PullOutcome};
use audx_core::{AudioFormat, AudioFrame, AudioSource, AudxError, ReadOutcome, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Everything one run needs
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Encoder name; `None` writes raw s16 PCM
    pub codec: Option<String>,
    pub quality: Quality,
    /// Explicit bitrate, overrides `quality`
    pub bitrate: Option<String>,
    /// Filter chain; `None` or blank disables filtering
    pub filter: Option<String>,
    pub decode: DecodeSettings,
    pub filter_settings: FilterSettings,
}

impl PipelineConfig {
    /// Raw PCM output with default settings
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            codec: None,
            quality: Quality::default(),
            bitrate: None,
            filter: None,
            decode: DecodeSettings::default(),
            filter_settings: FilterSettings::default(),
        }
    }

    /// Filter chain, if one is set and not blank
    pub fn filter_chain(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|chain| !chain.is_empty())
    }

    /// Resolve encoder settings, validating the bitrate first
    ///
    /// The bitrate is checked even without a codec so a malformed value is
    /// never silently ignored.
    pub fn encoder_settings(&self) -> Result<Option<EncoderSettings>> {
        if let Some(bitrate) = &self.bitrate {
            parse_bitrate(bitrate)?;
        }
        self.codec
            .as_deref()
            .map(|codec| {
                EncoderSettings::resolve(codec, self.quality, self.bitrate.as_deref())
                    .map(|s| s.with_resampling_quality(self.decode.resampling_quality))
            })
            .transpose()
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub chunks_decoded: u64,
    pub samples_decoded: u64,
    pub frames_dispatched: u64,
    pub samples_dispatched: u64,
    pub skipped_units: u64,
    pub failed_writes: u64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chunks / {} samples decoded, {} frames / {} samples written, {} skipped, {} failed writes",
            self.chunks_decoded,
            self.samples_decoded,
            self.frames_dispatched,
            self.samples_dispatched,
            self.skipped_units,
            self.failed_writes
        )
    }
}

/// Raw PCM output file
struct RawSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl RawSink {
    fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|e| {
            AudxError::container(format!("cannot create '{}': {}", path.display(), e))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: Some(BufWriter::new(file)),
        })
    }

    fn append(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("raw output closed"))?
            .write_all(bytes)
            .map_err(|e| AudxError::container(format!("write to '{}' failed: {}", self.path.display(), e)))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                AudxError::container(format!("flush of '{}' failed: {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }
}

enum Downstream {
    Encode(EncodeAdapter),
    Raw(RawSink),
}

impl Downstream {
    fn write(&mut self, frame: &AudioFrame) -> Result<()> {
        match self {
            Self::Encode(encoder) => encoder.write(Some(frame)),
            Self::Raw(sink) => sink.append(frame.as_bytes()),
        }
    }

    fn finish(&mut self) -> Result<()> {
        match self {
            Self::Encode(encoder) => encoder.finalize(),
            Self::Raw(sink) => sink.close().map_err(AudxError::finalize),
        }
    }
}

/// Decode → (filter) → encode-or-raw for one input file
pub struct Pipeline {
    source: Option<Box<dyn AudioSource>>,
    filter: Option<FilterGraph>,
    downstream: Option<Downstream>,
    state: PipelineStateMachine,
    summary: RunSummary,
    decoded_pts: i64,
}

impl Pipeline {
    /// Open the input, filter and output described by `config`
    pub fn open(config: &PipelineConfig) -> Result<Self> {
        let encoder = config.encoder_settings()?;
        let decoder = SymphoniaDecoder::open(&config.input, config.decode)?;
        let info = decoder.info();
        info!(
            input = %config.input.display(),
            codec = %info.codec,
            sample_rate = info.sample_rate,
            channels = info.channels,
            "Input opened"
        );
        Self::build(Box::new(decoder), config, encoder)
    }

    /// Build a pipeline around an already opened source
    pub fn with_source(source: Box<dyn AudioSource>, config: &PipelineConfig) -> Result<Self> {
        let encoder = config.encoder_settings()?;
        Self::build(source, config, encoder)
    }

    fn build(
        source: Box<dyn AudioSource>,
        config: &PipelineConfig,
        encoder: Option<EncoderSettings>,
    ) -> Result<Self> {
        let format = source.output_format();

        let filter = match config.filter_chain() {
            Some(chain) => {
                let graph = FilterGraph::init(format, chain, config.filter_settings)?;
                info!(chain, nodes = ?graph.node_names(), "Filtering enabled");
                Some(graph)
            }
            None => None,
        };
        let downstream_format = filter
            .as_ref()
            .map_or(format, FilterGraph::output_format);

        let downstream = match encoder {
            Some(settings) => {
                info!(codec = %settings.codec, rate_control = ?settings.rate_control, "Encoding output");
                Downstream::Encode(EncodeAdapter::open(
                    &config.output,
                    downstream_format,
                    settings,
                )?)
            }
            None => {
                info!(format = %downstream_format, "Writing raw PCM");
                Downstream::Raw(RawSink::create(&config.output)?)
            }
        };

        Ok(Self {
            source: Some(source),
            filter,
            downstream: Some(downstream),
            state: PipelineStateMachine::new(),
            summary: RunSummary::default(),
            decoded_pts: 0,
        })
    }

    /// Current orchestrator state
    pub fn state(&self) -> PipelineState {
        self.state.state()
    }

    /// Format of frames reaching the encoder or raw sink
    pub fn downstream_format(&self) -> Option<AudioFormat> {
        match (&self.filter, &self.source) {
            (Some(filter), _) => Some(filter.output_format()),
            (None, Some(source)) => Some(source.output_format()),
            (None, None) => None,
        }
    }

    /// Run to completion
    pub fn run(mut self) -> Result<RunSummary> {
        self.state.start_streaming()?;
        self.log_events();

        let result = self.stream().and_then(|()| self.drain());
        self.teardown();

        let summary = self.summary;
        match &result {
            Ok(()) => info!(%summary, "Run complete"),
            Err(e) => warn!(error = %e, %summary, "Run failed"),
        }
        result.map(|()| summary)
    }

    fn stream(&mut self) -> Result<()> {
        loop {
            let source = self
                .source
                .as_mut()
                .ok_or_else(|| AudxError::invalid_state("source closed"))?;
            let format = source.output_format();

            match source.read()? {
                ReadOutcome::Chunk(chunk) => {
                    let frame = AudioFrame::from_chunk(chunk, self.decoded_pts)?;
                    self.decoded_pts += frame.sample_count() as i64;
                    self.summary.chunks_decoded += 1;
                    self.summary.samples_decoded += frame.sample_count() as u64;
                    debug_assert_eq!(frame.format(), format);
                    self.process(&frame);
                }
                ReadOutcome::Skip => {
                    self.summary.skipped_units += 1;
                    self.state.record_skip("source unit skipped");
                }
                ReadOutcome::EndOfStream => break,
            }
        }
        Ok(())
    }

    /// Push one decoded frame through the filter (if any) and downstream
    fn process(&mut self, frame: &AudioFrame) {
        let Some(filter) = self.filter.as_mut() else {
            self.dispatch_lossy(frame);
            return;
        };

        if let Err(e) = filter.push(frame) {
            warn!(error = %e, pts = frame.pts(), "Filter rejected frame, skipping");
            self.summary.failed_writes += 1;
            self.state.record_skip(e.to_string());
            return;
        }

        loop {
            let pulled = self.filter.as_mut().map(FilterGraph::pull);
            match pulled {
                Some(Ok(PullOutcome::Frame(out))) => self.dispatch_lossy(&out),
                Some(Ok(PullOutcome::NeedMoreInput | PullOutcome::EndOfStream)) | None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "Filter pull failed, skipping");
                    self.summary.failed_writes += 1;
                    self.state.record_skip(e.to_string());
                    break;
                }
            }
        }
    }

    /// Write downstream, logging and counting failures instead of stopping
    fn dispatch_lossy(&mut self, frame: &AudioFrame) {
        if let Err(e) = self.dispatch(frame) {
            warn!(error = %e, pts = frame.pts(), "Write failed, frame skipped");
            self.summary.failed_writes += 1;
            self.state.record_skip(e.to_string());
        }
    }

    fn dispatch(&mut self, frame: &AudioFrame) -> Result<()> {
        self.downstream
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("output closed"))?
            .write(frame)?;
        self.summary.frames_dispatched += 1;
        self.summary.samples_dispatched += frame.sample_count() as u64;
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.state.start_draining()?;
        self.log_events();

        if let Some(mut filter) = self.filter.take() {
            filter.push_eof()?;
            loop {
                match filter.pull()? {
                    PullOutcome::Frame(frame) => self.dispatch(&frame)?,
                    PullOutcome::NeedMoreInput | PullOutcome::EndOfStream => break,
                }
            }
        }

        if let Some(mut downstream) = self.downstream.take() {
            downstream.finish()?;
        }
        Ok(())
    }

    /// Release every stage; runs on success and failure alike
    fn teardown(&mut self) {
        self.filter = None;
        self.downstream = None;
        self.source = None;
        if !self.state.is_closed() {
            // Streaming failures skip Draining
            if self.state.state() == PipelineState::Streaming {
                let _ = self.state.start_draining();
            }
            let _ = self.state.close();
        }
        self.log_events();
    }

    fn log_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                PipelineEvent::StateChanged { from, to } => debug!(%from, %to, "Pipeline state"),
                PipelineEvent::EndOfStream => debug!("End of input"),
                PipelineEvent::Skipped { reason } => debug!(%reason, "Skipped"),
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Open and run a pipeline in one call
pub fn run(config: &PipelineConfig) -> Result<RunSummary> {
    Pipeline::open(config)?.run()
}
