//! `pcm_s16le`: raw signed 16-bit little-endian output

use super::EncoderSettings;
use audx_core::{
    AudioFormat, AudioFrame, AudxError, ChannelLayout, CodecParameters, EncodedPacket,
    EncoderBackend, Result, SampleFormat,
};
use std::collections::VecDeque;

pub const NAME: &str = "pcm_s16le";

pub struct PcmEncoder {
    format: AudioFormat,
    packets: VecDeque<EncodedPacket>,
    flushed: bool,
}

impl PcmEncoder {
    pub fn new(source: AudioFormat, _settings: &EncoderSettings) -> Result<Self> {
        let channels = source.layout.channels();
        if channels == 0 {
            return Err(AudxError::UnsupportedFormat(
                "pcm_s16le: no channels".to_string(),
            ));
        }
        let layout = if source.layout.mask() == 0 {
            ChannelLayout::default_for(channels)
        } else {
            source.layout
        };
        Ok(Self {
            format: AudioFormat::new(source.sample_rate, layout, SampleFormat::S16),
            packets: VecDeque::new(),
            flushed: false,
        })
    }
}

impl EncoderBackend for PcmEncoder {
    fn name(&self) -> &'static str {
        NAME
    }

    fn input_format(&self) -> AudioFormat {
        self.format
    }

    fn frame_size(&self) -> Option<usize> {
        None
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
            return Err(AudxError::codec("pcm_s16le: frame sent after flush"));
        }
        match frame {
            Some(frame) => {
                if frame.format() != self.format {
                    return Err(AudxError::codec(format!(
                        "pcm_s16le: expected {}, got {}",
                        self.format,
                        frame.format()
                    )));
                }
                self.packets.push_back(EncodedPacket::new(
                    frame.as_bytes().to_vec(),
                    frame.pts(),
                    frame.sample_count() as i64,
                ));
            }
            None => self.flushed = true,
        }
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<Option<EncodedPacket>> {
        Ok(self.packets.pop_front())
    }
}
