/// Encoded packets and the codec parameters a container needs
use super::audio::AudioFormat;
use super::time::TimeBase;

/// One unit of compressed output with timing in some time base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Compressed bytes
    pub data: Vec<u8>,
    /// Presentation timestamp
    pub pts: i64,
    /// Duration covered by the packet
    pub duration: i64,
}

impl EncodedPacket {
    /// Create a packet
    pub fn new(data: Vec<u8>, pts: i64, duration: i64) -> Self {
        Self {
            data,
            pts,
            duration,
        }
    }

    /// Same packet with timestamps moved from `from` into `to`
    #[must_use]
    pub fn rescaled(self, from: TimeBase, to: TimeBase) -> Self {
        if from == to {
            return self;
        }
        Self {
            pts: from.rescale(self.pts, to),
            duration: from.rescale(self.duration, to),
            data: self.data,
        }
    }
}

/// Stream description an encoder hands to the container writer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecParameters {
    /// Encoder name, e.g. "libmp3lame"
    pub codec_name: &'static str,
    /// Native input format of the encoder
    pub format: AudioFormat,
    /// Target bitrate in bits per second, `None` for lossless codecs
    pub bit_rate: Option<u32>,
    /// Priming samples the decoder must discard
    pub initial_padding: u32,
    /// Codec-specific setup bytes
    pub extradata: Vec<u8>,
}
