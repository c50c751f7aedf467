//! `libmp3lame` via mp3lame-encoder

use super::EncoderSettings;
use crate::conversion::sample::s16_values;
use audx_core::{
    AudioFormat, AudioFrame, AudxError, ChannelLayout, CodecParameters, EncodedPacket,
    EncoderBackend, Result, SampleFormat,
};
use mp3lame_encoder::{Bitrate, Builder, Encoder, FlushNoGap, InterleavedPcm, MonoPcm, Quality};
use std::collections::VecDeque;

pub const NAME: &str = "libmp3lame";

/// Sample rates LAME accepts
pub const SUPPORTED_RATES: [u32; 9] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000,
];

/// Encoder delay plus decoder delay, in samples
const PRIMING_SAMPLES: u32 = 576 + 529;

const BITRATES: [(u32, Bitrate); 16] = [
    (8, Bitrate::Kbps8),
    (16, Bitrate::Kbps16),
    (24, Bitrate::Kbps24),
    (32, Bitrate::Kbps32),
    (40, Bitrate::Kbps40),
    (48, Bitrate::Kbps48),
    (64, Bitrate::Kbps64),
    (80, Bitrate::Kbps80),
    (96, Bitrate::Kbps96),
    (112, Bitrate::Kbps112),
    (128, Bitrate::Kbps128),
    (160, Bitrate::Kbps160),
    (192, Bitrate::Kbps192),
    (224, Bitrate::Kbps224),
    (256, Bitrate::Kbps256),
    (320, Bitrate::Kbps320),
];

/// Closest supported rate, preferring the higher one on ties
pub fn nearest_rate(rate: u32) -> u32 {
    SUPPORTED_RATES
        .iter()
        .copied()
        .min_by_key(|r| (r.abs_diff(rate), std::cmp::Reverse(*r)))
        .unwrap_or(44_100)
}

/// Samples per MPEG audio frame at `rate`
pub fn frame_size_for(rate: u32) -> usize {
    if rate < 32_000 {
        576
    } else {
        1152
    }
}

/// Largest LAME bitrate not above `bits` (or the lowest one)
fn lame_bitrate(bits: u32) -> (u32, Bitrate) {
    let kbps = bits / 1000;
    BITRATES
        .iter()
        .rev()
        .find(|(k, _)| *k <= kbps)
        .copied()
        .unwrap_or(BITRATES[0])
}

pub struct Mp3Encoder {
    encoder: Encoder,
    format: AudioFormat,
    bit_rate: u32,
    packets: VecDeque<EncodedPacket>,
    flushed: bool,
}

impl Mp3Encoder {
    pub fn new(source: AudioFormat, settings: &EncoderSettings) -> Result<Self> {
        let channels = source.layout.channels();
        if !(1..=2).contains(&channels) {
            return Err(AudxError::UnsupportedFormat(format!(
                "libmp3lame: {} channels not supported",
                channels
            )));
        }
        let rate = nearest_rate(source.sample_rate);
        let requested = settings.bitrate().unwrap_or(192_000);
        let (kbps, bitrate) = lame_bitrate(requested);

        let lame_err = |what: &str, e: &dyn std::fmt::Debug| {
            AudxError::codec(format!("libmp3lame: {}: {:?}", what, e))
        };
        let mut builder = Builder::new()
            .ok_or_else(|| AudxError::ResourceExhausted("libmp3lame: cannot allocate encoder".to_string()))?;
        builder
            .set_num_channels(channels as u8)
            .map_err(|e| lame_err("channels", &e))?;
        builder
            .set_sample_rate(rate)
            .map_err(|e| lame_err("sample rate", &e))?;
        builder
            .set_brate(bitrate)
            .map_err(|e| lame_err("bitrate", &e))?;
        builder
            .set_quality(Quality::Best)
            .map_err(|e| lame_err("quality", &e))?;
        let encoder = builder.build().map_err(|e| lame_err("init", &e))?;

        Ok(Self {
            encoder,
            format: AudioFormat::new(rate, ChannelLayout::default_for(channels), SampleFormat::S16),
            bit_rate: kbps * 1000,
            packets: VecDeque::new(),
            flushed: false,
        })
    }
}

impl EncoderBackend for Mp3Encoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn input_format(&self) -> AudioFormat {
        self.format
    }

    fn frame_size(&self) -> Option<usize> {
        Some(frame_size_for(self.format.sample_rate))
    }

    fn parameters(&self) -> CodecParameters {
        CodecParameters {
            codec_name: NAME,
            format: self.format,
            bit_rate: Some(self.bit_rate),
            initial_padding: PRIMING_SAMPLES,
            extradata: Vec::new(),
        }
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<()> {
        if self.flushed {
            return Err(AudxError::codec("libmp3lame: frame sent after flush"));
        }

        let Some(frame) = frame else {
            self.flushed = true;
            let mut out = Vec::with_capacity(7200);
            self.encoder
                .flush_to_vec::<FlushNoGap>(&mut out)
                .map_err(|e| AudxError::codec(format!("libmp3lame: flush: {:?}", e)))?;
            if !out.is_empty() {
                self.packets.push_back(EncodedPacket::new(out, 0, 0));
            }
            return Ok(());
        };

        if frame.format() != self.format {
            return Err(AudxError::codec(format!(
                "libmp3lame: expected {}, got {}",
                self.format,
                frame.format()
            )));
        }

        let pcm = s16_values(frame.as_bytes());
        let mut out = Vec::new();
        out.reserve(mp3lame_encoder::max_required_buffer_size(frame.sample_count()));
        let encoded = if self.format.channels() == 1 {
            self.encoder.encode_to_vec(MonoPcm(&pcm), &mut out)
        } else {
            self.encoder.encode_to_vec(InterleavedPcm(&pcm), &mut out)
        };
        encoded.map_err(|e| AudxError::codec(format!("libmp3lame: encode: {:?}", e)))?;

        if !out.is_empty() {
            self.packets.push_back(EncodedPacket::new(
                out,
                frame.pts(),
                frame.sample_count() as i64,
            ));
        }
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>> {
        Ok(self.packets.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_to_supported_rates() {
        assert_eq!(nearest_rate(44_100), 44_100);
        assert_eq!(nearest_rate(96_000), 48_000);
        assert_eq!(nearest_rate(7_000), 8_000);
        assert_eq!(nearest_rate(46_050), 48_000);
    }

    #[test]
    fn frame_size_depends_on_rate() {
        assert_eq!(frame_size_for(44_100), 1152);
        assert_eq!(frame_size_for(22_050), 576);
    }

    #[test]
    fn bitrate_rounds_down_to_lame_table() {
        assert_eq!(lame_bitrate(256_000).0, 256);
        assert_eq!(lame_bitrate(250_000).0, 224);
        assert_eq!(lame_bitrate(1_000).0, 8);
        assert_eq!(lame_bitrate(999_000).0, 320);
    }
}
