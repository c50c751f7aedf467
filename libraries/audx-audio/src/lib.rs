//! audx audio
//!
//! Decoding, filtering, encoding and the pipeline that connects them.
//!
//! This crate provides:
//! - Audio decoding via Symphonia (MP3, FLAC, OGG/Vorbis, WAV, AAC)
//! - Sample format, channel layout and sample rate conversion (rubato)
//! - A linear filter graph (`volume`, `atempo`, `aresample`, `lowpass`, ...)
//! - Frame-aligned encoding to MP3, FLAC, PCM, Opus and AAC
//! - Raw, WAV and Ogg output
//!
//! # Example: Transcoding a File
//!
//! ```rust,no_run
//! use audx_audio::encoder::Quality;
//! use audx_audio::pipeline::{self, PipelineConfig};
//!
//! # fn example() -> audx_core::Result<()> {
//! let mut config = PipelineConfig::new("input.flac", "output.mp3");
//! config.codec = Some("libmp3lame".to_string());
//! config.quality = Quality::Extreme;
//! config.filter = Some("atempo=1.25".to_string());
//!
//! let summary = pipeline::run(&config)?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Converting PCM
//!
//! ```rust
//! use audx_audio::conversion::FormatConverter;
//! use audx_audio::resampling::ResamplingQuality;
//! use audx_core::{AudioFormat, ChannelLayout, SampleFormat};
//!
//! let input = AudioFormat::cd_quality();
//! let output = AudioFormat::new(48_000, ChannelLayout::MONO, SampleFormat::F32);
//! let converter = FormatConverter::new(input, output, ResamplingQuality::Fast).unwrap();
//! assert!(!converter.is_passthrough());
//! ```

pub mod conversion;
pub mod decoder;
pub mod encoder;
pub mod filter;
pub mod mux;
pub mod pipeline;
pub mod resampling;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use conversion::FormatConverter;
pub use decoder::{DecodeSettings, StreamInfo, SymphoniaDecoder};
pub use encoder::{EncodeAdapter, EncoderSettings, Quality};
pub use filter::{FilterGraph, FilterSettings, PullOutcome};
pub use pipeline::{Pipeline, PipelineConfig, RunSummary};
pub use resampling::{Resampler, ResamplingQuality};
