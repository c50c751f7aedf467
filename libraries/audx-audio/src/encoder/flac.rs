//! `flac` via flacenc
//!
//! Each block of `FRAME_SIZE` samples is encoded as soon as it arrives and
//! comes out as one packet. The first packet carries the `fLaC` marker and
//! STREAMINFO. The header is written before the stream length is known, so
//! total samples and MD5 are left as "unknown" (zero).

use super::EncoderSettings;
use audx_core::{
    AudioFormat, AudioFrame, AudxError, ChannelLayout, CodecParameters, EncodedPacket,
    EncoderBackend, Result, SampleFormat,
};
use flacenc::bitsink::ByteSink;
use flacenc::component::{BitRepr, Stream, StreamInfo};
use flacenc::config;
use flacenc::error::{Verified, Verify};
use flacenc::source::{Fill, FrameBuf};
use std::collections::VecDeque;
use tracing::debug;

pub const NAME: &str = "flac";

/// Samples per FLAC block
pub const FRAME_SIZE: usize = 4096;

const MAX_CHANNELS: u16 = 8;
const BITS_PER_SAMPLE: usize = 16;

pub struct FlacEncoder {
    format: AudioFormat,
    config: Verified<config::Encoder>,
    stream_info: StreamInfo,
    framebuf: FrameBuf,
    frame_number: usize,
    samples_encoded: i64,
    header: Option<Vec<u8>>,
    pending: VecDeque<EncodedPacket>,
    short_block_seen: bool,
    flushed: bool,
}

impl FlacEncoder {
    pub fn new(source: AudioFormat, settings: &EncoderSettings) -> Result<Self> {
        let channels = source.layout.channels();
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(AudxError::UnsupportedFormat(format!(
                "flac: {} channels not supported",
                channels
            )));
        }
        if source.sample_rate == 0 || source.sample_rate > 655_350 {
            return Err(AudxError::UnsupportedFormat(format!(
                "flac: sample rate {} not supported",
                source.sample_rate
            )));
        }
        let format = AudioFormat::new(
            source.sample_rate,
            ChannelLayout::default_for(channels),
            SampleFormat::S16,
        );

        let mut encoder_config = config::Encoder::default();
        encoder_config.block_size = FRAME_SIZE;
        let encoder_config = encoder_config
            .into_verified()
            .map_err(|e| AudxError::codec(format!("flac: config error: {:?}", e)))?;

        let stream_info = header_stream_info(format)?;
        let header = encode_header(&stream_info)?;
        let framebuf = FrameBuf::with_size(format.channels(), FRAME_SIZE)
            .map_err(|e| AudxError::codec(format!("flac: {:?}", e)))?;

        debug!(
            channels = format.channels(),
            sample_rate = format.sample_rate,
            compression_level = ?settings.compression_level(),
            "FLAC encoder ready"
        );

        Ok(Self {
            format,
            config: encoder_config,
            stream_info,
            framebuf,
            frame_number: 0,
            samples_encoded: 0,
            header: Some(header),
            pending: VecDeque::new(),
            short_block_seen: false,
            flushed: false,
        })
    }

    fn encode_block(&mut self, frame: &AudioFrame) -> Result<()> {
        let count = frame.sample_count();
        if count > FRAME_SIZE {
            return Err(AudxError::codec(format!(
                "flac: block of {} samples exceeds {}",
                count, FRAME_SIZE
            )));
        }
        if self.short_block_seen {
            return Err(AudxError::codec(
                "flac: only the last block may be shorter than the block size",
            ));
        }
        self.short_block_seen = count < FRAME_SIZE;

        let interleaved: Vec<i32> = frame
            .as_bytes()
            .chunks_exact(2)
            .map(|c| i32::from(i16::from_le_bytes([c[0], c[1]])))
            .collect();
        self.framebuf
            .fill_interleaved(&interleaved)
            .map_err(|e| AudxError::codec(format!("flac: {:?}", e)))?;

        let encoded = flacenc::encode_fixed_size_frame(
            &self.config,
            &self.framebuf,
            self.frame_number,
            &self.stream_info,
        )
        .map_err(|e| AudxError::codec(format!("flac: encode error: {:?}", e)))?;

        let mut sink = ByteSink::new();
        encoded
            .write(&mut sink)
            .map_err(|e| AudxError::codec(format!("flac: write error: {:?}", e)))?;
        let mut data = self.header.take().unwrap_or_default();
        data.extend_from_slice(sink.as_slice());

        self.pending.push_back(EncodedPacket::new(
            data,
            self.samples_encoded,
            count as i64,
        ));
        self.frame_number += 1;
        self.samples_encoded += count as i64;
        Ok(())
    }
}

/// STREAMINFO for a fixed-blocksize stream of unknown length
fn header_stream_info(format: AudioFormat) -> Result<StreamInfo> {
    let to_err = |e: flacenc::error::VerifyError| AudxError::codec(format!("flac: {:?}", e));
    let mut info = StreamInfo::new(format.sample_rate as usize, format.channels(), BITS_PER_SAMPLE)
        .map_err(to_err)?;
    info.set_block_sizes(FRAME_SIZE, FRAME_SIZE).map_err(to_err)?;
    info.set_frame_sizes(0, 0).map_err(to_err)?;
    Ok(info)
}

/// `fLaC` followed by the STREAMINFO metadata block
fn encode_header(info: &StreamInfo) -> Result<Vec<u8>> {
    let stream = Stream::with_stream_info(info.clone());
    let mut sink = ByteSink::new();
    stream
        .write(&mut sink)
        .map_err(|e| AudxError::codec(format!("flac: write error: {:?}", e)))?;
    Ok(sink.into_inner())
}

impl EncoderBackend for FlacEncoder {
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
            bit_rate: None,
            initial_padding: 0,
            extradata: Vec::new(),
        }
    }

    fn send_frame(&mut self, frame: Option<&AudioFrame>) -> Result<()> {
        if self.flushed {
            return Err(AudxError::codec("flac: frame sent after flush"));
        }
        let Some(frame) = frame else {
            self.flushed = true;
            debug!(
                frames = self.frame_number,
                samples = self.samples_encoded,
                "FLAC stream flushed"
            );
            // An empty stream still needs a parseable header
            if let Some(header) = self.header.take() {
                self.pending.push_back(EncodedPacket::new(header, 0, 0));
            }
            return Ok(());
        };

        if frame.format() != self.format {
            return Err(AudxError::codec(format!(
                "flac: expected {}, got {}",
                self.format,
                frame.format()
            )));
        }
        if frame.sample_count() == 0 {
            return Ok(());
        }
        self.encode_block(frame)
    }

    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>> {
        Ok(self.pending.pop_front())
    }
}
