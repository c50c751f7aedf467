//! Quality presets, codec families and bitrate parsing

use crate::resampling::ResamplingQuality;
use audx_core::{AudxError, Result};
use std::fmt;
use std::str::FromStr;

/// Quality tier selected on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
    Extreme,
}

impl Quality {
    /// All tiers, lowest first
    pub const ALL: [Quality; 4] = [Self::Low, Self::Medium, Self::High, Self::Extreme];

    fn index(self) -> usize {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Extreme => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Extreme => "extreme",
        }
    }
}

impl FromStr for Quality {
    type Err = AudxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "extreme" => Ok(Self::Extreme),
            other => Err(AudxError::invalid_parameter(format!(
                "unknown quality '{}' (expected low, medium, high or extreme)",
                other
            ))),
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec families sharing a quality table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecFamily {
    Mp3,
    Aac,
    Opus,
    /// Lossless and raw codecs, tuned by compression level
    Lossless,
}

const MP3_BITRATES: [u32; 4] = [128_000, 192_000, 256_000, 320_000];
const AAC_BITRATES: [u32; 4] = [96_000, 160_000, 256_000, 320_000];
const OPUS_BITRATES: [u32; 4] = [96_000, 128_000, 192_000, 256_000];
const COMPRESSION_LEVELS: [u8; 4] = [5, 8, 10, 12];

impl CodecFamily {
    /// Family for an encoder name; `None` when the name is not known
    pub fn from_codec_name(name: &str) -> Option<Self> {
        match name {
            "libmp3lame" => Some(Self::Mp3),
            "aac" => Some(Self::Aac),
            "libopus" => Some(Self::Opus),
            "flac" | "alac" | "pcm_s16le" => Some(Self::Lossless),
            _ => None,
        }
    }

    pub fn is_lossless(self) -> bool {
        self == Self::Lossless
    }

    /// Preset bitrate in bits/s, `None` for lossless codecs
    pub fn bitrate_for(self, quality: Quality) -> Option<u32> {
        let table = match self {
            Self::Mp3 => &MP3_BITRATES,
            Self::Aac => &AAC_BITRATES,
            Self::Opus => &OPUS_BITRATES,
            Self::Lossless => return None,
        };
        Some(table[quality.index()])
    }

    /// Preset compression level, `None` for lossy codecs
    pub fn compression_level_for(self, quality: Quality) -> Option<u8> {
        self.is_lossless()
            .then(|| COMPRESSION_LEVELS[quality.index()])
    }
}

/// Parse a bitrate such as `192000`, `192k` or `192K` into bits/s
pub fn parse_bitrate(text: &str) -> Result<u32> {
    let invalid = || AudxError::InvalidBitrate(text.to_string());

    let (digits, multiplier) = match text.strip_suffix(['k', 'K']) {
        Some(digits) => (digits, 1000u64),
        None => (text, 1),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let bits = value.checked_mul(multiplier).ok_or_else(invalid)?;
    if bits == 0 || bits > i32::MAX as u64 {
        return Err(invalid());
    }
    Ok(bits as u32)
}

/// How the encoder's output size is controlled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    /// Target bits per second
    Bitrate(u32),
    /// Lossless compression effort
    CompressionLevel(u8),
}

/// Fully resolved encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub codec: String,
    pub family: CodecFamily,
    pub rate_control: RateControl,
    pub resampling_quality: ResamplingQuality,
}

impl EncoderSettings {
    /// Resolve a codec name, preset and optional explicit bitrate
    ///
    /// An explicit bitrate wins over the preset. The bitrate is validated
    /// before the codec name so a malformed value is always reported.
    pub fn resolve(codec: &str, quality: Quality, bitrate: Option<&str>) -> Result<Self> {
        let explicit = bitrate.map(parse_bitrate).transpose()?;
        let family = CodecFamily::from_codec_name(codec)
            .ok_or_else(|| AudxError::EncoderNotFound(codec.to_string()))?;

        let rate_control = match (explicit, family.bitrate_for(quality)) {
            (Some(bits), _) => RateControl::Bitrate(bits),
            (None, Some(bits)) => RateControl::Bitrate(bits),
            (None, None) => RateControl::CompressionLevel(
                family.compression_level_for(quality).unwrap_or(COMPRESSION_LEVELS[2]),
            ),
        };

        Ok(Self {
            codec: codec.to_string(),
            family,
            rate_control,
            resampling_quality: ResamplingQuality::default(),
        })
    }

    /// Override the quality used by the encoder's format converter
    pub fn with_resampling_quality(mut self, quality: ResamplingQuality) -> Self {
        self.resampling_quality = quality;
        self
    }

    /// Target bitrate, if the settings carry one
    pub fn bitrate(&self) -> Option<u32> {
        match self.rate_control {
            RateControl::Bitrate(bits) => Some(bits),
            RateControl::CompressionLevel(_) => None,
        }
    }

    /// Compression level, if the settings carry one
    pub fn compression_level(&self) -> Option<u8> {
        match self.rate_control {
            RateControl::CompressionLevel(level) => Some(level),
            RateControl::Bitrate(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitrate_suffixes() {
        assert_eq!(parse_bitrate("192k").unwrap(), 192_000);
        assert_eq!(parse_bitrate("192K").unwrap(), 192_000);
        assert_eq!(parse_bitrate("128000").unwrap(), 128_000);
    }

    #[test]
    fn bitrate_rejects_garbage() {
        for text in ["abc", "", "k", "12.5k", "-5", "0", "0k", "192kb", " 192", "99999999999999999999", "2147484k"] {
            assert!(
                matches!(parse_bitrate(text), Err(AudxError::InvalidBitrate(_))),
                "{text:?} should be rejected"
            );
        }
        assert_eq!(parse_bitrate("2147483647").unwrap(), i32::MAX as u32);
    }

    #[test]
    fn preset_tables() {
        assert_eq!(CodecFamily::Mp3.bitrate_for(Quality::Extreme), Some(320_000));
        assert_eq!(CodecFamily::Mp3.bitrate_for(Quality::High), Some(256_000));
        assert_eq!(CodecFamily::Aac.bitrate_for(Quality::Low), Some(96_000));
        assert_eq!(CodecFamily::Opus.bitrate_for(Quality::Medium), Some(128_000));
        assert_eq!(CodecFamily::Lossless.bitrate_for(Quality::Extreme), None);
        assert_eq!(CodecFamily::Lossless.compression_level_for(Quality::Extreme), Some(12));
        assert_eq!(CodecFamily::Mp3.compression_level_for(Quality::Extreme), None);
    }

    #[test]
    fn extreme_lossy_gets_top_tier() {
        for (codec, top) in [("libmp3lame", 320_000), ("aac", 320_000), ("libopus", 256_000)] {
            let settings = EncoderSettings::resolve(codec, Quality::Extreme, None).unwrap();
            assert_eq!(settings.bitrate(), Some(top));
            assert_eq!(settings.compression_level(), None);
        }
    }

    #[test]
    fn lossless_gets_compression_level() {
        let settings = EncoderSettings::resolve("flac", Quality::Medium, None).unwrap();
        assert_eq!(settings.rate_control, RateControl::CompressionLevel(8));
        assert_eq!(settings.bitrate(), None);
    }

    #[test]
    fn explicit_bitrate_overrides_preset() {
        let settings = EncoderSettings::resolve("libmp3lame", Quality::Low, Some("320k")).unwrap();
        assert_eq!(settings.bitrate(), Some(320_000));
    }

    #[test]
    fn unknown_codec_is_not_found() {
        assert!(matches!(
            EncoderSettings::resolve("vorbis", Quality::High, None),
            Err(AudxError::EncoderNotFound(_))
        ));
        assert!(matches!(
            EncoderSettings::resolve("vorbis", Quality::High, Some("abc")),
            Err(AudxError::InvalidBitrate(_))
        ));
    }

    #[test]
    fn quality_names_round_trip() {
        for q in Quality::ALL {
            assert_eq!(q.as_str().parse::<Quality>().unwrap(), q);
        }
        assert!("ultra".parse::<Quality>().is_err());
    }
}
