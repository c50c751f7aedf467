/// Audio-related types
use crate::error::{AudxError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sample representation of interleaved little-endian PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit, centred on 128
    U8,
    /// Signed 16-bit
    S16,
    /// Signed 24-bit packed in 3 bytes
    S24,
    /// Signed 32-bit
    S32,
    /// 32-bit float in [-1.0, 1.0]
    F32,
    /// 64-bit float in [-1.0, 1.0]
    F64,
}

impl SampleFormat {
    /// Width of one sample of one channel in bytes
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Graph-facing name, `None` when the filter graph cannot carry this representation
    pub const fn name(self) -> Option<&'static str> {
        match self {
            Self::U8 => Some("u8"),
            Self::S16 => Some("s16"),
            Self::S24 => None,
            Self::S32 => Some("s32"),
            Self::F32 => Some("flt"),
            Self::F64 => Some("dbl"),
        }
    }

    /// Parse a graph-facing name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "u8" => Some(Self::U8),
            "s16" => Some(Self::S16),
            "s32" => Some(Self::S32),
            "flt" => Some(Self::F32),
            "dbl" => Some(Self::F64),
            _ => None,
        }
    }

    /// Whether samples are floating point
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }
}

/// Channel count plus speaker positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelLayout {
    channels: u16,
    mask: u64,
}

impl ChannelLayout {
    pub const FRONT_LEFT: u64 = 0x1;
    pub const FRONT_RIGHT: u64 = 0x2;
    pub const FRONT_CENTER: u64 = 0x4;
    pub const LOW_FREQUENCY: u64 = 0x8;
    pub const BACK_LEFT: u64 = 0x10;
    pub const BACK_RIGHT: u64 = 0x20;
    pub const BACK_CENTER: u64 = 0x100;
    pub const SIDE_LEFT: u64 = 0x200;
    pub const SIDE_RIGHT: u64 = 0x400;

    pub const MONO: Self = Self::from_mask(Self::FRONT_CENTER);
    pub const STEREO: Self = Self::from_mask(Self::FRONT_LEFT | Self::FRONT_RIGHT);

    const fn from_mask(mask: u64) -> Self {
        Self {
            channels: mask.count_ones() as u16,
            mask,
        }
    }

    /// Layout with a channel count but no speaker positions
    pub const fn unspecified(channels: u16) -> Self {
        Self { channels, mask: 0 }
    }

    /// Default layout for a channel count (mono, stereo, 2.1, 4.0, 5.0, 5.1, 6.1, 7.1)
    pub const fn default_for(channels: u16) -> Self {
        const FL_FR: u64 = ChannelLayout::FRONT_LEFT | ChannelLayout::FRONT_RIGHT;
        const FIVE_ZERO: u64 = FL_FR
            | ChannelLayout::FRONT_CENTER
            | ChannelLayout::BACK_LEFT
            | ChannelLayout::BACK_RIGHT;
        match channels {
            1 => Self::MONO,
            2 => Self::STEREO,
            3 => Self::from_mask(FL_FR | Self::LOW_FREQUENCY),
            4 => Self::from_mask(FL_FR | Self::FRONT_CENTER | Self::BACK_CENTER),
            5 => Self::from_mask(FIVE_ZERO),
            6 => Self::from_mask(FIVE_ZERO | Self::LOW_FREQUENCY),
            7 => Self::from_mask(
                FL_FR
                    | Self::FRONT_CENTER
                    | Self::LOW_FREQUENCY
                    | Self::BACK_CENTER
                    | Self::SIDE_LEFT
                    | Self::SIDE_RIGHT,
            ),
            8 => Self::from_mask(FIVE_ZERO | Self::LOW_FREQUENCY | Self::SIDE_LEFT | Self::SIDE_RIGHT),
            n => Self::unspecified(n),
        }
    }

    /// Number of channels
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    /// Speaker position bitmask, 0 when unspecified
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    /// A layout with no channels carries no audio
    pub const fn is_empty(&self) -> bool {
        self.channels == 0
    }

    /// Human-readable description, e.g. "stereo" or "3 channels"
    pub fn describe(&self) -> String {
        let named = [
            (Self::default_for(1), "mono"),
            (Self::default_for(2), "stereo"),
            (Self::default_for(3), "2.1"),
            (Self::default_for(4), "4.0"),
            (Self::default_for(5), "5.0"),
            (Self::default_for(6), "5.1"),
            (Self::default_for(7), "6.1"),
            (Self::default_for(8), "7.1"),
        ];
        named
            .iter()
            .find(|(layout, _)| layout.mask == self.mask && self.mask != 0)
            .map(|(_, name)| (*name).to_string())
            .unwrap_or_else(|| format!("{} channels", self.channels))
    }
}

impl fmt::Display for ChannelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Sample rate, channel layout and sample representation of interleaved PCM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel layout
    pub layout: ChannelLayout,

    /// Sample representation
    pub sample_format: SampleFormat,
}

impl AudioFormat {
    /// Create a new audio format
    pub const fn new(sample_rate: u32, layout: ChannelLayout, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            layout,
            sample_format,
        }
    }

    /// CD quality: 44.1kHz, stereo, signed 16-bit
    pub const fn cd_quality() -> Self {
        Self::new(44_100, ChannelLayout::STEREO, SampleFormat::S16)
    }

    /// Number of channels
    pub fn channels(&self) -> usize {
        usize::from(self.layout.channels())
    }

    /// Bytes taken by one sample across all channels
    pub fn bytes_per_frame(&self) -> usize {
        self.channels() * self.sample_format.bytes_per_sample()
    }

    /// Same format with a different sample representation
    #[must_use]
    pub const fn with_sample_format(self, sample_format: SampleFormat) -> Self {
        Self {
            sample_format,
            ..self
        }
    }

    /// Same format with a different sample rate
    #[must_use]
    pub const fn with_sample_rate(self, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            ..self
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, {}, {}",
            self.sample_rate,
            self.layout,
            self.sample_format.name().unwrap_or("s24")
        )
    }
}

/// Interleaved PCM bytes in a known format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmChunk {
    data: Vec<u8>,
    format: AudioFormat,
}

impl PcmChunk {
    /// Wrap PCM bytes
    pub fn new(data: Vec<u8>, format: AudioFormat) -> Self {
        Self { data, format }
    }

    /// Format of the bytes
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Raw interleaved bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the chunk is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of whole samples per channel
    pub fn sample_count(&self) -> usize {
        match self.format.bytes_per_frame() {
            0 => 0,
            width => self.data.len() / width,
        }
    }
}

/// PCM chunk with an explicit sample count and presentation index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    chunk: PcmChunk,
    sample_count: usize,
    pts: i64,
}

impl AudioFrame {
    /// Create a frame, checking `len == sample_count * channels * bytes_per_sample`
    pub fn new(data: Vec<u8>, format: AudioFormat, sample_count: usize, pts: i64) -> Result<Self> {
        let expected = sample_count
            .checked_mul(format.bytes_per_frame())
            .ok_or_else(|| AudxError::ResourceExhausted("frame size overflow".to_string()))?;
        if data.len() != expected {
            return Err(AudxError::InvalidFormat(format!(
                "frame of {} samples in {} needs {} bytes, got {}",
                sample_count,
                format,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            chunk: PcmChunk::new(data, format),
            sample_count,
            pts,
        })
    }

    /// Wrap a chunk, deriving the sample count from its byte length
    pub fn from_chunk(chunk: PcmChunk, pts: i64) -> Result<Self> {
        let format = chunk.format();
        if format.bytes_per_frame() == 0 {
            return Err(AudxError::InvalidFormat(
                "chunk has no channels".to_string(),
            ));
        }
        let sample_count = chunk.len() / format.bytes_per_frame();
        Self::new(chunk.into_bytes(), format, sample_count, pts)
    }

    /// Samples per channel
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    /// Presentation index in samples
    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// Format of the frame
    pub fn format(&self) -> AudioFormat {
        self.chunk.format()
    }

    /// Raw interleaved bytes
    pub fn as_bytes(&self) -> &[u8] {
        self.chunk.as_bytes()
    }

    /// Take the underlying chunk
    pub fn into_chunk(self) -> PcmChunk {
        self.chunk
    }
}
