//! `aac` (AAC-LC in ADTS) via fdk-aac

use super::EncoderSettings;
use crate::conversion::sample::s16_values;
use audx_core::{
    AudioFormat, AudioFrame, AudxError, ChannelLayout, CodecParameters, EncodedPacket,
    EncoderBackend, Result, SampleFormat,
};
use fdk_aac::enc::{
    AudioObjectType, BitRate, ChannelMode, Encoder, EncoderParams, Transport,
};
use std::collections::VecDeque;

pub const NAME: &str = "aac";

/// Samples per AAC-LC frame
pub const FRAME_SIZE: usize = 1024;

/// Sample rates with an ADTS frequency index
pub const SUPPORTED_RATES: [u32; 12] = [
    8_000, 11_025, 12_000, 16_000, 22_050, 24_000, 32_000, 44_100, 48_000, 64_000, 88_200,
    96_000,
];

/// Bytes of output room per channel per frame
const OUTPUT_PER_CHANNEL: usize = 768;

/// Silent frames that cover the AAC-LC encoder delay
const DRAIN_FRAMES: usize = 2;

pub fn nearest_rate(rate: u32) -> u32 {
    SUPPORTED_RATES
        .iter()
        .copied()
        .min_by_key(|r| (r.abs_diff(rate), std::cmp::Reverse(*r)))
        .unwrap_or(48_000)
}

pub struct AacEncoder {
    encoder: Encoder,
    format: AudioFormat,
    bit_rate: u32,
    packets: VecDeque<EncodedPacket>,
    /// Timestamp of the next packet out
    next_pts: i64,
    flushed: bool,
}

impl AacEncoder {
    pub fn new(source: AudioFormat, settings: &EncoderSettings) -> Result<Self> {
        let channels = source.layout.channels();
        let mode = match channels {
            1 => ChannelMode::Mono,
            2 => ChannelMode::Stereo,
            n => {
                return Err(AudxError::UnsupportedFormat(format!(
                    "aac: {} channels not supported",
                    n
                )))
            }
        };
        let rate = nearest_rate(source.sample_rate);
        let bit_rate = settings.bitrate().unwrap_or(160_000);

        let encoder = Encoder::new(EncoderParams {
            bit_rate: BitRate::Cbr(bit_rate),
            sample_rate: rate,
            transport: Transport::Adts,
            channels: mode,
            audio_object_type: AudioObjectType::Mpeg4LowComplexity,
        })
        .map_err(|e| AudxError::codec(format!("aac: init: {:?}", e)))?;

        Ok(Self {
            encoder,
            format: AudioFormat::new(rate, ChannelLayout::default_for(channels), SampleFormat::S16),
            bit_rate,
            packets: VecDeque::new(),
            next_pts: 0,
            flushed: false,
        })
    }

    /// Feed interleaved samples until fdk-aac has taken all of them
    ///
    /// Returns the number of bytes produced.
    fn encode(&mut self, pcm: &[i16]) -> Result<usize> {
        let mut out = vec![0u8; OUTPUT_PER_CHANNEL * self.format.channels() * 2];
        let mut remaining = pcm;
        let mut produced = 0;
        loop {
            let info = self
                .encoder
                .encode(remaining, &mut out)
                .map_err(|e| AudxError::codec(format!("aac: encode: {:?}", e)))?;
            if info.output_size > 0 {
                self.packets.push_back(EncodedPacket::new(
                    out[..info.output_size].to_vec(),
                    self.next_pts,
                    FRAME_SIZE as i64,
                ));
                self.next_pts += FRAME_SIZE as i64;
                produced += info.output_size;
            }

            let consumed = info.input_consumed.min(remaining.len());
            remaining = &remaining[consumed..];
            if remaining.is_empty() {
                return Ok(produced);
            }
            if consumed == 0 && info.output_size == 0 {
                return Err(AudxError::codec(format!(
                    "aac: encoder stalled with {} samples pending",
                    remaining.len()
                )));
            }
        }
    }
}

impl EncoderBackend for AacEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn input_format(&self) -> AudioFormat {
        self.format
    }

    fn frame_size(&self) -> Option<usize> {
        Some(FRAME_SIZE)
    }

    fn parameters(&self) -> CodecParameters {
        CodecParameters {
            codec_name: NAME,
            format: self.format,
            bit_rate: Some(self.bit_rate),
            initial_padding: FRAME_SIZE as u32,
            extradata: Vec::new(),
        }
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<()> {
        if self.flushed {
            return Err(AudxError::codec("aac: frame sent after flush"));
        }

        let Some(frame) = frame else {
            self.flushed = true;
            // Silence pushes the encoder's look-ahead out
            let silence = vec![0i16; FRAME_SIZE * self.format.channels()];
            for _ in 0..DRAIN_FRAMES {
                if self.encode(&silence)? == 0 {
                    break;
                }
            }
            return Ok(());
        };

        if frame.format() != self.format {
            return Err(AudxError::codec(format!(
                "aac: expected {}, got {}",
                self.format,
                frame.format()
            )));
        }
        let pcm = s16_values(frame.as_bytes());
        self.encode(&pcm)?;
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>> {
        Ok(self.packets.pop_front())
    }
}
