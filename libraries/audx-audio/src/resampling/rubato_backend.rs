//! Rubato resampler backend
//!
//! Input-driven resampling with the rubato crate. Input is buffered until a
//! full chunk is available, the filter delay is trimmed from the start of the
//! output, and `flush()` pads the tail so the total output length matches
//! `ceil(frames_in * output_rate / input_rate)`.

use super::{output_frames_for, validate, ResamplerImpl, ResamplingError, ResamplingQuality, Result};
use rubato::{
    FastFixedIn, PolynomialDegree, Resampler as RubatoResamplerTrait, SincFixedIn,
    SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::collections::VecDeque;

/// Upper bound on zero-fed chunks used to push the filter tail out
const MAX_FLUSH_ROUNDS: usize = 16;

/// Enum to hold different rubato resampler types
enum RubatoResamplerType {
    FastIn(FastFixedIn<f32>),
    SincIn(SincFixedIn<f32>),
}

/// Rubato-based resampler implementation
pub struct RubatoResampler {
    resampler: RubatoResamplerType,
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    /// Buffer for accumulating input samples when they don't fill a complete chunk
    input_buffer: VecDeque<f32>,
    /// Output frames still to drop from the start of the stream
    pending_delay: usize,
    frames_in: u64,
    frames_out: u64,
}

impl RubatoResampler {
    /// Create a new rubato resampler
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: usize,
        quality: ResamplingQuality,
    ) -> Result<Self> {
        validate(input_rate, output_rate, channels)?;
        let ratio = f64::from(output_rate) / f64::from(input_rate);

        let chunk_size = match quality {
            ResamplingQuality::Fast | ResamplingQuality::Balanced => 1024,
            ResamplingQuality::High => 2048,
            ResamplingQuality::Maximum => 4096,
        };

        let resampler = match quality {
            ResamplingQuality::Fast => RubatoResamplerType::FastIn(
                FastFixedIn::new(ratio, 1.0, PolynomialDegree::Cubic, chunk_size, channels)
                    .map_err(|e| {
                        ResamplingError::InitializationFailed(format!(
                            "FastFixedIn creation failed: {}",
                            e
                        ))
                    })?,
            ),
            _ => RubatoResamplerType::SincIn(
                SincFixedIn::<f32>::new(
                    ratio,
                    1.0,
                    Self::quality_to_params(quality),
                    chunk_size,
                    channels,
                )
                .map_err(|e| {
                    ResamplingError::InitializationFailed(format!(
                        "SincFixedIn creation failed: {}",
                        e
                    ))
                })?,
            ),
        };

        let mut this = Self {
            resampler,
            input_rate,
            output_rate,
            channels,
            input_buffer: VecDeque::new(),
            pending_delay: 0,
            frames_in: 0,
            frames_out: 0,
        };
        this.pending_delay = this.output_delay();
        Ok(this)
    }

    /// Convert quality preset to rubato parameters
    ///
    /// The cutoff sits one transition band below Nyquist.
    fn quality_to_params(quality: ResamplingQuality) -> SincInterpolationParameters {
        let (sinc_len, oversampling_factor) = match quality {
            ResamplingQuality::Fast | ResamplingQuality::Balanced => (128, 256),
            ResamplingQuality::High => (256, 512),
            ResamplingQuality::Maximum => (512, 1024),
        };
        SincInterpolationParameters {
            sinc_len,
            f_cutoff: (1.0 - quality.transition_band()) as f32,
            interpolation: SincInterpolationType::Cubic,
            oversampling_factor,
            window: WindowFunction::BlackmanHarris2,
        }
    }

    /// Get expected input frame count for the next process call
    fn input_frames_next(&self) -> usize {
        match &self.resampler {
            RubatoResamplerType::FastIn(r) => r.input_frames_next(),
            RubatoResamplerType::SincIn(r) => r.input_frames_next(),
        }
    }

    /// Filter latency in output frames
    fn output_delay(&self) -> usize {
        match &self.resampler {
            RubatoResamplerType::FastIn(r) => r.output_delay(),
            RubatoResamplerType::SincIn(r) => r.output_delay(),
        }
    }

    /// Deinterleave samples from [L, R, L, R, ...] to [[L, L, ...], [R, R, ...]]
    fn deinterleave(&self, interleaved: &[f32]) -> Vec<Vec<f32>> {
        let frames = interleaved.len() / self.channels;
        let mut channels = vec![Vec::with_capacity(frames); self.channels];

        for frame in interleaved.chunks_exact(self.channels) {
            for (ch, sample) in frame.iter().enumerate() {
                channels[ch].push(*sample);
            }
        }

        channels
    }

    /// Interleave samples from [[L, L, ...], [R, R, ...]] to [L, R, L, R, ...]
    fn interleave(&self, channels: &[Vec<f32>]) -> Vec<f32> {
        let Some(first) = channels.first() else {
            return Vec::new();
        };

        let frames = first.len();
        let mut interleaved = Vec::with_capacity(frames * self.channels);

        for frame_idx in 0..frames {
            for channel in channels {
                interleaved.push(channel[frame_idx]);
            }
        }

        interleaved
    }

    /// Drop leading delay frames and account for what is handed out
    fn emit(&mut self, output_channels: &[Vec<f32>], out: &mut Vec<f32>) {
        let frames = output_channels.first().map_or(0, Vec::len);
        let skip = self.pending_delay.min(frames);
        self.pending_delay -= skip;

        let interleaved = self.interleave(output_channels);
        let kept = &interleaved[skip * self.channels..];
        self.frames_out += (kept.len() / self.channels) as u64;
        out.extend_from_slice(kept);
    }

    /// Resample exactly `input_frames_next()` frames
    fn run_chunk(&mut self, input: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        let result = match &mut self.resampler {
            RubatoResamplerType::FastIn(r) => r.process(input, None),
            RubatoResamplerType::SincIn(r) => r.process(input, None),
        };
        result.map_err(|e| ResamplingError::ProcessingFailed(format!("resampling failed: {}", e)))
    }

    /// Resample a short chunk, or a chunk of zeros when `input` is `None`
    fn run_partial(&mut self, input: Option<&[Vec<f32>]>) -> Result<Vec<Vec<f32>>> {
        let result = match &mut self.resampler {
            RubatoResamplerType::FastIn(r) => r.process_partial(input, None),
            RubatoResamplerType::SincIn(r) => r.process_partial(input, None),
        };
        result.map_err(|e| ResamplingError::ProcessingFailed(format!("flush failed: {}", e)))
    }

    /// Flush any remaining buffered samples using partial processing
    ///
    /// Call this at the end of a stream to retrieve any samples that were
    /// buffered but not yet processed (because they didn't fill a complete chunk),
    /// plus the filter tail.
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        // 1:1 passthrough - just drain the buffer
        if self.input_rate == self.output_rate {
            return Ok(self.input_buffer.drain(..).collect());
        }

        let target = output_frames_for(self.frames_in, self.input_rate, self.output_rate);
        let mut output = Vec::new();

        if !self.input_buffer.is_empty() {
            let remaining: Vec<f32> = self.input_buffer.drain(..).collect();
            let input_channels = self.deinterleave(&remaining);
            let output_channels = self.run_partial(Some(&input_channels))?;
            self.emit(&output_channels, &mut output);
        }

        let mut rounds = 0;
        while self.frames_out < target && rounds < MAX_FLUSH_ROUNDS {
            let output_channels = self.run_partial(None)?;
            self.emit(&output_channels, &mut output);
            rounds += 1;
        }

        if self.frames_out > target {
            let excess = (self.frames_out - target) as usize;
            let excess = excess.min(output.len() / self.channels);
            output.truncate(output.len() - excess * self.channels);
            self.frames_out -= excess as u64;
        }

        Ok(output)
    }
}

impl ResamplerImpl for RubatoResampler {
    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.is_empty() {
            return Ok(Vec::new());
        }

        if input.len() % self.channels != 0 {
            return Err(ResamplingError::BufferSizeMismatch {
                len: input.len(),
                channels: self.channels,
            });
        }

        // 1:1 passthrough - no filtering, no delay
        if self.input_rate == self.output_rate {
            return Ok(input.to_vec());
        }

        self.frames_in += (input.len() / self.channels) as u64;
        self.input_buffer.extend(input.iter().copied());

        let mut output = Vec::new();

        // Process complete chunks only
        loop {
            let needed_samples = self.input_frames_next() * self.channels;

            if self.input_buffer.len() < needed_samples {
                break;
            }

            let chunk: Vec<f32> = self.input_buffer.drain(..needed_samples).collect();
            let input_channels = self.deinterleave(&chunk);
            let output_channels = self.run_chunk(&input_channels)?;
            self.emit(&output_channels, &mut output);
        }

        Ok(output)
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        RubatoResampler::flush(self)
    }

    fn buffered_frames(&self) -> usize {
        self.input_buffer.len() / self.channels
    }

    fn input_rate(&self) -> u32 {
        self.input_rate
    }

    fn output_rate(&self) -> u32 {
        self.output_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn reset(&mut self) {
        self.input_buffer.clear();

        match &mut self.resampler {
            RubatoResamplerType::FastIn(r) => r.reset(),
            RubatoResamplerType::SincIn(r) => r.reset(),
        }

        self.pending_delay = self.output_delay();
        self.frames_in = 0;
        self.frames_out = 0;
    }
}
