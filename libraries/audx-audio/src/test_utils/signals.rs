//! Test signal generation
//!
//! Signals are interleaved f32 with the same value on every channel.

use std::f32::consts::PI;
use std::path::Path;

/// Generate a sine wave
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `sample_rate` - Sample rate in Hz
/// * `channels` - Channels to interleave
/// * `frames` - Samples per channel
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
pub fn generate_sine_wave(
    frequency: f32,
    sample_rate: u32,
    channels: usize,
    frames: usize,
    amplitude: f32,
) -> Vec<f32> {
    let mut samples = Vec::with_capacity(frames * channels);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (2.0 * PI * frequency * t).sin() * amplitude;
        samples.extend(std::iter::repeat(sample).take(channels));
    }
    samples
}

/// Generate silence
pub fn generate_silence(channels: usize, frames: usize) -> Vec<f32> {
    vec![0.0; channels * frames]
}

/// Quantize to i16 the same way the crate's converters do
pub fn to_i16_samples(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|s| (s * 32768.0).round().clamp(-32768.0, 32767.0) as i16)
        .collect()
}

/// Little-endian s16 bytes
pub fn to_s16_bytes(samples: &[f32]) -> Vec<u8> {
    to_i16_samples(samples)
        .into_iter()
        .flat_map(i16::to_le_bytes)
        .collect()
}

/// Write a 16-bit PCM WAV file
pub fn write_wav_fixture(
    path: &Path,
    sample_rate: u32,
    channels: u16,
    samples: &[f32],
) -> hound::Result<()> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in to_i16_samples(samples) {
        writer.write_sample(s)?;
    }
    writer.finalize()
}
