//! `libopus` via the opus crate
//!
//! Opus always runs at 48 kHz here. Packets are stamped in 1/48000 units
//! counted from the start of the encoder's output, so the end timestamp of
//! a packet is directly its Ogg granule position.

use super::EncoderSettings;
use crate::conversion::sample;
use audx_core::{
    AudioFormat, AudioFrame, AudxError, ChannelLayout, CodecParameters, EncodedPacket,
    EncoderBackend, Result, SampleFormat,
};
use opus::{Application, Bitrate, Channels, Encoder};
use std::collections::VecDeque;

pub const NAME: &str = "libopus";

pub const SAMPLE_RATE: u32 = 48_000;

/// 20 ms at 48 kHz
pub const FRAME_SIZE: usize = 960;

/// Largest packet libopus can produce
const MAX_PACKET: usize = 4000;

pub struct OpusEncoder {
    encoder: Encoder,
    format: AudioFormat,
    bit_rate: u32,
    pre_skip: u32,
    /// Real input samples received
    samples_in: u64,
    /// Samples handed to libopus, including padding
    samples_encoded: u64,
    packets: VecDeque<EncodedPacket>,
    flushed: bool,
}

impl OpusEncoder {
    pub fn new(source: AudioFormat, settings: &EncoderSettings) -> Result<Self> {
        let channels = match source.layout.channels() {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            n => {
                return Err(AudxError::UnsupportedFormat(format!(
                    "libopus: {} channels not supported",
                    n
                )))
            }
        };
        let opus_err = |e: opus::Error| AudxError::codec(format!("libopus: {}", e));

        let mut encoder =
            Encoder::new(SAMPLE_RATE, channels, Application::Audio).map_err(opus_err)?;
        let bit_rate = settings.bitrate().unwrap_or(128_000);
        encoder
            .set_bitrate(Bitrate::Bits(bit_rate as i32))
            .map_err(opus_err)?;
        let pre_skip = encoder.get_lookahead().map_err(opus_err)?.max(0) as u32;

        Ok(Self {
            encoder,
            format: AudioFormat::new(
                SAMPLE_RATE,
                ChannelLayout::default_for(source.layout.channels()),
                SampleFormat::F32,
            ),
            bit_rate,
            pre_skip,
            samples_in: 0,
            samples_encoded: 0,
            packets: VecDeque::new(),
            flushed: false,
        })
    }

    /// `OpusHead` identification header
    fn opus_head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1);
        head.push(self.format.channels() as u8);
        head.extend_from_slice(&(self.pre_skip as u16).to_le_bytes());
        head.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes());
        head.push(0);
        head
    }

    /// Encode exactly one frame of interleaved samples, zero-padding short input
    fn encode_frame(&mut self, samples: &[f32]) -> Result<()> {
        let channels = self.format.channels();
        let mut input = samples.to_vec();
        input.resize(FRAME_SIZE * channels, 0.0);

        let mut out = vec![0u8; MAX_PACKET];
        let len = self
            .encoder
            .encode_float(&input, &mut out)
            .map_err(|e| AudxError::codec(format!("libopus: encode: {}", e)))?;
        out.truncate(len);

        let pts = self.samples_encoded as i64;
        self.samples_encoded += FRAME_SIZE as u64;
        self.packets
            .push_back(EncodedPacket::new(out, pts, FRAME_SIZE as i64));
        Ok(())
    }
}

impl EncoderBackend for OpusEncoder {
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
            initial_padding: self.pre_skip,
            extradata: self.opus_head(),
        }
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<()> {
        if self.flushed {
            return Err(AudxError::codec("libopus: frame sent after flush"));
        }

        let Some(frame) = frame else {
            self.flushed = true;
            // Push silence until the look-ahead has been emitted too
            let end = self.samples_in + u64::from(self.pre_skip);
            while self.samples_encoded < end {
                self.encode_frame(&[])?;
            }
            // The final packet ends exactly at the last real sample
            if let Some(last) = self.packets.back_mut() {
                last.duration = end as i64 - last.pts;
            }
            return Ok(());
        };

        if frame.format() != self.format {
            return Err(AudxError::codec(format!(
                "libopus: expected {}, got {}",
                self.format,
                frame.format()
            )));
        }
        if frame.sample_count() > FRAME_SIZE {
            return Err(AudxError::codec(format!(
                "libopus: frame of {} samples exceeds {}",
                frame.sample_count(),
                FRAME_SIZE
            )));
        }

        let samples = sample::decode(frame.as_bytes(), SampleFormat::F32);
        self.samples_in += frame.sample_count() as u64;
        self.encode_frame(&samples)
    }

    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>> {
        // The last packet's duration is settled only at the flush
        if !self.flushed && self.packets.len() <= 1 {
            return Ok(None);
        }
        Ok(self.packets.pop_front())
    }
}
