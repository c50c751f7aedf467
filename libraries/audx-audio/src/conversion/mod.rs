//! Format Conversion
//!
//! [`FormatConverter`] turns PCM in one [`AudioFormat`] into another: sample
//! representation, channel layout and sample rate. Both formats are fixed at
//! construction. A rate change buffers input inside the resampler, so a
//! sequence of variable-length inputs produces one continuous output stream;
//! call [`FormatConverter::flush`] at end of stream to drain it.
//!
//! ```rust
//! use audx_audio::conversion::FormatConverter;
//! use audx_audio::resampling::ResamplingQuality;
//! use audx_core::{AudioFormat, ChannelLayout, PcmChunk, SampleFormat};
//!
//! let input = AudioFormat::new(44_100, ChannelLayout::STEREO, SampleFormat::S16);
//! let output = AudioFormat::new(44_100, ChannelLayout::MONO, SampleFormat::F32);
//! let mut converter = FormatConverter::new(input, output, ResamplingQuality::High).unwrap();
//!
//! let converted = converter.convert(&PcmChunk::new(vec![0u8; 400], input)).unwrap();
//! assert_eq!(converted.sample_count(), 100);
//! ```

mod remix;
pub(crate) mod sample;

use crate::resampling::{output_frames_for, validate, Resampler, ResamplingQuality};
use audx_core::{AudioFormat, AudxError, PcmChunk, Result};
use remix::ChannelRemix;

/// Converts PCM between two fixed formats, tracking resampler delay
pub struct FormatConverter {
    input: AudioFormat,
    output: AudioFormat,
    remix: ChannelRemix,
    resampler: Option<Resampler>,
}

impl FormatConverter {
    /// Build a converter from `input` to `output`
    ///
    /// # Errors
    /// Returns `AudxError::Conversion` for zero or out-of-range rates and for
    /// channel counts outside 1-8.
    pub fn new(input: AudioFormat, output: AudioFormat, quality: ResamplingQuality) -> Result<Self> {
        validate(input.sample_rate, output.sample_rate, input.channels())?;
        validate(input.sample_rate, output.sample_rate, output.channels())?;

        let resampler = if input.sample_rate == output.sample_rate {
            None
        } else {
            Some(Resampler::new(
                input.sample_rate,
                output.sample_rate,
                output.channels(),
                quality,
            )?)
        };

        Ok(Self {
            input,
            output,
            remix: ChannelRemix::new(input.layout, output.layout),
            resampler,
        })
    }

    /// Format accepted by `convert`
    pub fn input_format(&self) -> AudioFormat {
        self.input
    }

    /// Format produced by `convert`
    pub fn output_format(&self) -> AudioFormat {
        self.output
    }

    /// Whether input bytes are copied through unchanged
    pub fn is_passthrough(&self) -> bool {
        self.input.sample_format == self.output.sample_format
            && self.resampler.is_none()
            && self.remix.is_identity()
    }

    /// Input samples held inside the converter, at the input rate
    pub fn delay(&self) -> usize {
        self.resampler.as_ref().map_or(0, Resampler::buffered_frames)
    }

    /// Upper bound on samples produced for `input_samples` more input
    ///
    /// `ceil((delay + input_samples) * output_rate / input_rate)`. The actual
    /// count returned by `convert` may be lower.
    pub fn estimate_output_samples(&self, input_samples: usize) -> usize {
        let frames = (self.delay() + input_samples) as u64;
        output_frames_for(frames, self.input.sample_rate, self.output.sample_rate) as usize
    }

    /// Convert one chunk; its format must equal `input_format()`
    pub fn convert(&mut self, chunk: &PcmChunk) -> Result<PcmChunk> {
        if chunk.format() != self.input {
            return Err(AudxError::conversion(format!(
                "chunk format ({}) does not match converter input ({})",
                chunk.format(),
                self.input
            )));
        }
        self.convert_bytes(chunk.as_bytes())
    }

    /// Convert raw interleaved bytes in `input_format()`
    pub fn convert_bytes(&mut self, bytes: &[u8]) -> Result<PcmChunk> {
        let width = self.input.bytes_per_frame();
        if bytes.len() % width != 0 {
            return Err(AudxError::conversion(format!(
                "{} bytes is not a whole number of {}-byte samples",
                bytes.len(),
                width
            )));
        }

        if self.is_passthrough() {
            return Ok(PcmChunk::new(bytes.to_vec(), self.output));
        }

        let samples = sample::decode(bytes, self.input.sample_format);
        self.convert_f32(&samples)
    }

    /// Convert interleaved f32 samples laid out in the input layout and rate
    pub fn convert_f32(&mut self, samples: &[f32]) -> Result<PcmChunk> {
        if samples.len() % self.input.channels() != 0 {
            return Err(AudxError::conversion(format!(
                "{} samples is not a multiple of {} channels",
                samples.len(),
                self.input.channels()
            )));
        }

        let remixed = self.remix.apply(samples);
        let resampled = match self.resampler.as_mut() {
            Some(resampler) => resampler.process(&remixed)?,
            None => remixed,
        };

        Ok(PcmChunk::new(
            sample::encode(&resampled, self.output.sample_format),
            self.output,
        ))
    }

    /// Drain samples still buffered in the resampler
    pub fn flush(&mut self) -> Result<PcmChunk> {
        let tail = match self.resampler.as_mut() {
            Some(resampler) => resampler.flush()?,
            None => Vec::new(),
        };
        Ok(PcmChunk::new(
            sample::encode(&tail, self.output.sample_format),
            self.output,
        ))
    }
}
