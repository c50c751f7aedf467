//! Container writers
//!
//! The container is picked from the output file extension and must agree
//! with the encoder: raw elementary streams for `.mp3`, `.aac`/`.adts`,
//! `.flac` and `.pcm`/`.raw`, WAV for `.wav`, Ogg for `.ogg`/`.opus`.

mod raw;
mod wav;

#[cfg(feature = "opus")]
mod ogg;

pub use raw::RawMuxer;
pub use wav::WavMuxer;

#[cfg(feature = "opus")]
pub use self::ogg::OggMuxer;

use audx_core::{AudxError, CodecParameters, Muxer, Result};
use std::path::Path;

/// Output container family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Codec bitstream written as-is
    Raw,
    Wav,
    Ogg,
}

impl ContainerKind {
    /// Container and the encoders it can carry, from the file extension
    pub fn for_path(path: &Path) -> Result<(Self, &'static [&'static str])> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "mp3" => Ok((Self::Raw, &["libmp3lame"])),
            "aac" | "adts" => Ok((Self::Raw, &["aac"])),
            "flac" => Ok((Self::Raw, &["flac"])),
            "pcm" | "raw" => Ok((Self::Raw, &["pcm_s16le"])),
            "wav" => Ok((Self::Wav, &["pcm_s16le"])),
            "ogg" | "opus" => Ok((Self::Ogg, &["libopus"])),
            _ => Err(AudxError::UnsupportedFormat(format!(
                "cannot determine output container for '{}'",
                path.display()
            ))),
        }
    }

    /// Check that `codec` can be stored at `path`
    pub fn resolve(path: &Path, codec: &str) -> Result<Self> {
        let (kind, codecs) = Self::for_path(path)?;
        if !codecs.contains(&codec) {
            return Err(AudxError::UnsupportedFormat(format!(
                "codec '{}' cannot be written to '{}' (expected {})",
                codec,
                path.display(),
                codecs.join(" or ")
            )));
        }
        Ok(kind)
    }
}

/// Create the output file and a writer for it
pub fn create_muxer(
    kind: ContainerKind,
    path: &Path,
    params: &CodecParameters,
) -> Result<Box<dyn Muxer>> {
    match kind {
        ContainerKind::Raw => Ok(Box::new(RawMuxer::create(path, params)?)),
        ContainerKind::Wav => Ok(Box::new(WavMuxer::create(path, params)?)),
        #[cfg(feature = "opus")]
        ContainerKind::Ogg => Ok(Box::new(OggMuxer::create(path, params)?)),
        #[cfg(not(feature = "opus"))]
        ContainerKind::Ogg => Err(AudxError::UnsupportedFormat(
            "Ogg output requires the opus feature".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_pick_containers() {
        assert_eq!(ContainerKind::resolve(Path::new("a.MP3"), "libmp3lame").unwrap(), ContainerKind::Raw);
        assert_eq!(ContainerKind::resolve(Path::new("a.wav"), "pcm_s16le").unwrap(), ContainerKind::Wav);
        assert_eq!(ContainerKind::resolve(Path::new("a.opus"), "libopus").unwrap(), ContainerKind::Ogg);
        assert_eq!(ContainerKind::resolve(Path::new("a.adts"), "aac").unwrap(), ContainerKind::Raw);
    }

    #[test]
    fn mismatches_are_unsupported() {
        for (path, codec) in [("a.wav", "libmp3lame"), ("a.mkv", "flac"), ("noext", "flac"), ("a.mp3", "flac")] {
            assert!(
                matches!(ContainerKind::resolve(Path::new(path), codec), Err(AudxError::UnsupportedFormat(_))),
                "{path} / {codec}"
            );
        }
    }
}
