//! Interleaved byte <-> f32 sample conversion
//!
//! Signed integers use symmetric scaling (divide by 2^(N-1)) so that an
//! integer -> f32 -> integer round trip of the same width is exact.

use audx_core::SampleFormat;

/// Decode interleaved little-endian bytes into f32 samples
pub(crate) fn decode(bytes: &[u8], format: SampleFormat) -> Vec<f32> {
    match format {
        SampleFormat::U8 => bytes
            .iter()
            .map(|b| (f32::from(*b) - 128.0) / 128.0)
            .collect(),
        SampleFormat::S16 => bytes
            .chunks_exact(2)
            .map(|c| f32::from(i16::from_le_bytes([c[0], c[1]])) / 32768.0)
            .collect(),
        SampleFormat::S24 => bytes
            .chunks_exact(3)
            .map(|c| {
                // Sign-extend by placing the 24 bits in the top of an i32
                let value = i32::from_le_bytes([0, c[0], c[1], c[2]]) >> 8;
                value as f32 / 8388608.0
            })
            .collect(),
        SampleFormat::S32 => bytes
            .chunks_exact(4)
            .map(|c| (f64::from(i32::from_le_bytes([c[0], c[1], c[2], c[3]])) / 2147483648.0) as f32)
            .collect(),
        SampleFormat::F32 => bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
        SampleFormat::F64 => bytes
            .chunks_exact(8)
            .map(|c| {
                f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
            })
            .collect(),
    }
}

/// Encode f32 samples as interleaved little-endian bytes, rounding and clamping integers
pub(crate) fn encode(samples: &[f32], format: SampleFormat) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    match format {
        SampleFormat::U8 => {
            for s in samples {
                out.push(((s * 128.0).round() + 128.0).clamp(0.0, 255.0) as u8);
            }
        }
        SampleFormat::S16 => {
            for s in samples {
                out.extend_from_slice(&to_i16(*s).to_le_bytes());
            }
        }
        SampleFormat::S24 => {
            for s in samples {
                let value = (f64::from(*s) * 8388608.0).round().clamp(-8388608.0, 8388607.0) as i32;
                out.extend_from_slice(&value.to_le_bytes()[..3]);
            }
        }
        SampleFormat::S32 => {
            for s in samples {
                let value = (f64::from(*s) * 2147483648.0)
                    .round()
                    .clamp(-2147483648.0, 2147483647.0) as i32;
                out.extend_from_slice(&value.to_le_bytes());
            }
        }
        SampleFormat::F32 => {
            for s in samples {
                out.extend_from_slice(&s.to_le_bytes());
            }
        }
        SampleFormat::F64 => {
            for s in samples {
                out.extend_from_slice(&f64::from(*s).to_le_bytes());
            }
        }
    }
    out
}

/// Scale, round and clamp one f32 sample to i16
pub(crate) fn to_i16(sample: f32) -> i16 {
    (sample * 32768.0).round().clamp(-32768.0, 32767.0) as i16
}

/// Read interleaved s16 bytes as i16 values
pub(crate) fn s16_values(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect()
}
