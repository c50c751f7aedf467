//! Sample Rate Conversion
//!
//! Streaming resampling on interleaved `f32` audio, backed by rubato.
//!
//! ## Features
//!
//! - **Quality presets**: Fast, Balanced, High, Maximum
//! - **Arbitrary sample rates**: 44.1kHz → 48kHz, 8kHz → 96kHz, etc.
//! - **Streaming**: arbitrary input lengths, buffered into fixed resampler chunks
//! - **Delay compensated**: filter latency is trimmed so output starts at input time zero
//!
//! ## Example
//!
//! ```rust
//! use audx_audio::resampling::{Resampler, ResamplingQuality};
//!
//! let mut resampler = Resampler::new(44100, 48000, 2, ResamplingQuality::Fast).unwrap();
//!
//! let input = vec![0.0; 4096]; // Stereo samples
//! let mut output = resampler.process(&input).unwrap();
//! output.extend(resampler.flush().unwrap());
//! assert_eq!(output.len() / 2, resampler.calculate_output_size(2048));
//! ```

mod rubato_backend;

use audx_core::AudxError;
use std::str::FromStr;
use thiserror::Error;

pub use rubato_backend::RubatoResampler;

/// Resampling errors
#[derive(Error, Debug)]
pub enum ResamplingError {
    #[error("Invalid sample rate: {0} Hz (must be > 0 and <= 1MHz)")]
    InvalidSampleRate(u32),

    #[error("Invalid channel count: {0} (must be 1-8)")]
    InvalidChannelCount(usize),

    #[error("Input buffer size {len} is not a multiple of channel count {channels}")]
    BufferSizeMismatch { len: usize, channels: usize },

    #[error("Resampler initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

impl From<ResamplingError> for AudxError {
    fn from(err: ResamplingError) -> Self {
        AudxError::conversion(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResamplingError>;

/// Resampling quality presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplingQuality {
    /// Fast - polynomial interpolation, low CPU
    Fast,

    /// Balanced - short sinc filter
    /// - Passband: 95% of Nyquist
    Balanced,

    /// High - long sinc filter
    /// - Passband: 99% of Nyquist
    #[default]
    High,

    /// Maximum - longest sinc filter
    /// - Passband: 99.5% of Nyquist
    Maximum,
}

impl ResamplingQuality {
    /// Get transition band width (0.0 - 1.0, normalized to Nyquist)
    pub fn transition_band(&self) -> f64 {
        match self {
            Self::Fast => 0.10,
            Self::Balanced => 0.05,
            Self::High => 0.01,
            Self::Maximum => 0.005,
        }
    }
}

impl FromStr for ResamplingQuality {
    type Err = AudxError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "high" => Ok(Self::High),
            "maximum" => Ok(Self::Maximum),
            other => Err(AudxError::invalid_parameter(format!(
                "unknown resampling quality '{other}' (expected fast, balanced, high or maximum)"
            ))),
        }
    }
}

/// Trait for resampler implementations
pub trait ResamplerImpl: Send {
    /// Process interleaved audio samples
    ///
    /// # Arguments
    /// - `input`: Interleaved input samples (e.g., [L, R, L, R, ...])
    ///
    /// # Returns
    /// Interleaved output samples at target sample rate. Input that does not
    /// fill a whole resampler chunk is held back until the next call or `flush()`.
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Drain buffered input at end of stream
    fn flush(&mut self) -> Result<Vec<f32>>;

    /// Input frames received but not yet turned into output
    fn buffered_frames(&self) -> usize;

    /// Get input sample rate
    fn input_rate(&self) -> u32;

    /// Get output sample rate
    fn output_rate(&self) -> u32;

    /// Get channel count
    fn channels(&self) -> usize;

    /// Reset internal state
    fn reset(&mut self);
}

/// High-level resampler interface
pub struct Resampler {
    backend: Box<dyn ResamplerImpl>,
}

impl Resampler {
    /// Create a new resampler
    ///
    /// # Arguments
    /// - `input_rate`: Input sample rate (Hz)
    /// - `output_rate`: Output sample rate (Hz)
    /// - `channels`: Number of channels (1-8)
    /// - `quality`: Quality preset
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        quality: ResamplingQuality,
    ) -> Result<Self> {
        validate(input_rate, output_rate, channels)?;

        Ok(Self {
            backend: Box::new(RubatoResampler::new(
                input_rate,
                output_rate,
                channels,
                quality,
            )?),
        })
    }

    /// Process interleaved audio samples
    pub fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.backend.process(input)
    }

    /// Drain everything still buffered
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        self.backend.flush()
    }

    /// Input frames held back waiting for a full chunk
    pub fn buffered_frames(&self) -> usize {
        self.backend.buffered_frames()
    }

    /// Get input sample rate
    pub fn input_rate(&self) -> u32 {
        self.backend.input_rate()
    }

    /// Get output sample rate
    pub fn output_rate(&self) -> u32 {
        self.backend.output_rate()
    }

    /// Get channel count
    pub fn channels(&self) -> usize {
        self.backend.channels()
    }

    /// Reset internal state
    pub fn reset(&mut self) {
        self.backend.reset();
    }

    /// Calculate expected output frames for given input frames
    ///
    /// Useful for pre-allocating buffers
    pub fn calculate_output_size(&self, input_frames: usize) -> usize {
        output_frames_for(input_frames as u64, self.input_rate(), self.output_rate()) as usize
    }
}

/// Check rate and channel bounds shared by every backend
pub(crate) fn validate(input_rate: u32, output_rate: u32, channels: usize) -> Result<()> {
    if input_rate == 0 || input_rate > 1_000_000 {
        return Err(ResamplingError::InvalidSampleRate(input_rate));
    }
    if output_rate == 0 || output_rate > 1_000_000 {
        return Err(ResamplingError::InvalidSampleRate(output_rate));
    }
    if channels == 0 || channels > 8 {
        return Err(ResamplingError::InvalidChannelCount(channels));
    }
    Ok(())
}

/// `ceil(frames * output_rate / input_rate)` in integer arithmetic
pub(crate) fn output_frames_for(frames: u64, input_rate: u32, output_rate: u32) -> u64 {
    let numer = u128::from(frames) * u128::from(output_rate);
    let denom = u128::from(input_rate.max(1));
    u64::try_from(numer.div_ceil(denom)).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_presets() {
        assert!(ResamplingQuality::Fast.transition_band() > ResamplingQuality::Balanced.transition_band());
        assert!(ResamplingQuality::Balanced.transition_band() > ResamplingQuality::High.transition_band());
        assert!(ResamplingQuality::High.transition_band() > ResamplingQuality::Maximum.transition_band());
    }

    #[test]
    fn test_quality_from_str() {
        assert_eq!("FAST".parse::<ResamplingQuality>().unwrap(), ResamplingQuality::Fast);
        assert!("ultra".parse::<ResamplingQuality>().is_err());
    }

    #[test]
    fn test_invalid_sample_rates() {
        let result = Resampler::new(0, 96000, 2, ResamplingQuality::High);
        assert!(matches!(result, Err(ResamplingError::InvalidSampleRate(0))));

        let result = Resampler::new(44100, 2_000_000, 2, ResamplingQuality::High);
        assert!(matches!(
            result,
            Err(ResamplingError::InvalidSampleRate(2_000_000))
        ));
    }

    #[test]
    fn test_invalid_channels() {
        let result = Resampler::new(44100, 96000, 0, ResamplingQuality::High);
        assert!(matches!(
            result,
            Err(ResamplingError::InvalidChannelCount(0))
        ));

        let result = Resampler::new(44100, 96000, 10, ResamplingQuality::High);
        assert!(matches!(
            result,
            Err(ResamplingError::InvalidChannelCount(10))
        ));
    }

    #[test]
    fn test_output_size_calculation() {
        let resampler = Resampler::new(44100, 96000, 2, ResamplingQuality::Balanced).unwrap();

        let expected_output = (1024.0f64 * (96000.0f64 / 44100.0f64)).ceil() as usize;
        assert_eq!(resampler.calculate_output_size(1024), expected_output);
    }

    #[test]
    fn test_error_maps_to_conversion() {
        let err: AudxError = ResamplingError::InvalidSampleRate(0).into();
        assert!(matches!(err, AudxError::Conversion(_)));
    }
}
