/// Decode adapter built on Symphonia
use crate::conversion::FormatConverter;
use crate::resampling::ResamplingQuality;
use audx_core::{
    AudioFormat, AudioSource, AudxError, ChannelLayout, PcmChunk, ReadOutcome, Result,
    SampleFormat,
};
use std::collections::VecDeque;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, SampleBuffer};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Default cap on back-to-back undecodable packets
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: usize = 32;

/// Decoder tuning
#[derive(Debug, Clone, Copy)]
pub struct DecodeSettings {
    /// Consecutive packet failures tolerated before the stream is abandoned
    pub max_consecutive_errors: usize,
    /// Quality used if the codec changes rate mid-stream
    pub resampling_quality: ResamplingQuality,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            resampling_quality: ResamplingQuality::default(),
        }
    }
}

/// Properties of the selected audio stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Short codec name, e.g. "mp3"
    pub codec: String,
    /// Total samples per channel, when the container declares it
    pub total_frames: Option<u64>,
}

/// Internal state of an open input
struct StreamState {
    /// Format reader (container parser)
    format: Box<dyn FormatReader>,
    /// Audio decoder
    decoder: Box<dyn Decoder>,
    /// Track ID
    track_id: u32,
}

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
///
/// Every chunk handed out by [`AudioSource::read`] is signed 16-bit
/// interleaved at the source sample rate, with the default layout for the
/// source channel count.
pub struct SymphoniaDecoder {
    stream_state: Option<StreamState>,
    converter: Option<FormatConverter>,
    pending: VecDeque<PcmChunk>,
    output: AudioFormat,
    info: StreamInfo,
    settings: DecodeSettings,
    consecutive_errors: usize,
    finished: bool,
}

impl SymphoniaDecoder {
    /// Open `path` and select its first audio stream
    ///
    /// # Errors
    /// - `AudxError::Open` if the file cannot be read or its container is not recognised
    /// - `AudxError::NoAudioStream` if no track carries audio
    /// - `AudxError::UnsupportedCodec` if no decoder handles the stream
    pub fn open(path: &Path, settings: DecodeSettings) -> Result<Self> {
        let display = path.display().to_string();

        let file = std::fs::File::open(path).map_err(|e| AudxError::open(&display, e.to_string()))?;

        // Create media source
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        // Probe the media source
        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudxError::open(&display, format!("failed to probe input: {}", e)))?;

        let format = probed.format;

        // First track that carries audio
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
            .ok_or_else(|| AudxError::NoAudioStream(display.clone()))?;

        let params = &track.codec_params;
        let track_id = track.id;
        let sample_rate = params.sample_rate.unwrap_or_default();
        let channels = params.channels.map_or(2, |c| c.count() as u16);
        let codec = symphonia::default::get_codecs()
            .get_codec(params.codec)
            .map_or_else(|| format!("{}", params.codec), |d| d.short_name.to_string());

        let decoder = symphonia::default::get_codecs()
            .make(params, &DecoderOptions::default())
            .map_err(|e| AudxError::UnsupportedCodec(format!("{} ({})", codec, e)))?;

        let info = StreamInfo {
            sample_rate,
            channels,
            codec,
            total_frames: params.n_frames,
        };
        let path_display = &display;
        debug!(
            path = %path_display,
            track_id,
            sample_rate,
            channels,
            codec = %info.codec,
            "Opened audio stream"
        );

        Ok(Self {
            stream_state: Some(StreamState {
                format,
                decoder,
                track_id,
            }),
            converter: None,
            pending: VecDeque::new(),
            output: AudioFormat::new(
                sample_rate,
                ChannelLayout::default_for(channels),
                SampleFormat::S16,
            ),
            info,
            settings,
            consecutive_errors: 0,
            finished: false,
        })
    }

    /// Properties of the selected stream
    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    /// Release the input; safe to call more than once
    pub fn close(&mut self) {
        self.stream_state = None;
        self.converter = None;
        self.pending.clear();
        self.finished = true;
    }

    /// Check if the input is still open
    pub fn is_open(&self) -> bool {
        self.stream_state.is_some()
    }

    /// Convert one decoded buffer to the output format
    ///
    /// The converter is keyed on the decoded buffer's own format, so a codec
    /// that changes representation or channel count mid-stream still yields
    /// chunks in the fixed output format.
    fn convert_buffer(
        decoded: AudioBufferRef<'_>,
        converter: &mut Option<FormatConverter>,
        pending: &mut VecDeque<PcmChunk>,
        output: AudioFormat,
        quality: ResamplingQuality,
    ) -> Result<PcmChunk> {
        let spec = *decoded.spec();
        let frames = decoded.frames();
        let native = match decoded {
            AudioBufferRef::S16(_) => SampleFormat::S16,
            _ => SampleFormat::F32,
        };
        let channel_count = spec.channels.count() as u16;
        let input = AudioFormat::new(spec.rate, ChannelLayout::default_for(channel_count), native);

        if converter.as_ref().map(FormatConverter::input_format) != Some(input) {
            if let Some(mut previous) = converter.take() {
                let tail = previous.flush()?;
                if !tail.is_empty() {
                    pending.push_back(tail);
                }
            }
            debug!(from = %input, to = %output, "Configuring decoder output conversion");
            *converter = Some(FormatConverter::new(input, output, quality)?);
        }
        let Some(converter) = converter.as_mut() else {
            return Err(AudxError::invalid_state("decoder converter missing"));
        };

        match native {
            SampleFormat::S16 => {
                let mut buf = SampleBuffer::<i16>::new(frames as u64, spec);
                buf.copy_interleaved_ref(decoded);
                let bytes: Vec<u8> = buf.samples().iter().flat_map(|s| s.to_le_bytes()).collect();
                converter.convert_bytes(&bytes)
            }
            _ => {
                let mut buf = SampleBuffer::<f32>::new(frames as u64, spec);
                buf.copy_interleaved_ref(decoded);
                converter.convert_f32(buf.samples())
            }
        }
    }

    /// Count a failed packet; fatal once the cap is exceeded
    fn recoverable_error(&mut self, err: &dyn std::fmt::Display) -> Result<ReadOutcome> {
        self.consecutive_errors += 1;
        if self.consecutive_errors > self.settings.max_consecutive_errors {
            return Err(AudxError::codec(format!(
                "giving up after {} consecutive decode errors, last: {}",
                self.consecutive_errors, err
            )));
        }
        warn!(
            error = %err,
            consecutive = self.consecutive_errors,
            "Skipping undecodable packet"
        );
        Ok(ReadOutcome::Skip)
    }

    /// Mark end of stream and queue whatever the converter still holds
    fn finish(&mut self) -> Result<ReadOutcome> {
        self.finished = true;
        self.stream_state = None;
        if let Some(mut converter) = self.converter.take() {
            let tail = converter.flush()?;
            if !tail.is_empty() {
                self.pending.push_back(tail);
            }
        }
        Ok(self
            .pending
            .pop_front()
            .map_or(ReadOutcome::EndOfStream, ReadOutcome::Chunk))
    }
}

impl AudioSource for SymphoniaDecoder {
    fn output_format(&self) -> AudioFormat {
        self.output
    }

    fn read(&mut self) -> Result<ReadOutcome> {
        if let Some(chunk) = self.pending.pop_front() {
            return Ok(ReadOutcome::Chunk(chunk));
        }
        if self.finished {
            return Ok(ReadOutcome::EndOfStream);
        }

        let Some(state) = self.stream_state.as_mut() else {
            return self.finish();
        };

        let packet = match state.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return self.finish();
            }
            Err(SymphoniaError::ResetRequired) => {
                state.decoder.reset();
                return Ok(ReadOutcome::Skip);
            }
            Err(e @ SymphoniaError::DecodeError(_)) => {
                return self.recoverable_error(&e);
            }
            Err(e) => return Err(AudxError::codec(format!("container read failed: {}", e))),
        };

        // Skip packets that are not for our track
        if packet.track_id() != state.track_id {
            return Ok(ReadOutcome::Skip);
        }

        let decoded = match state.decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                state.decoder.reset();
                return Ok(ReadOutcome::Skip);
            }
            Err(e @ (SymphoniaError::DecodeError(_) | SymphoniaError::IoError(_))) => {
                return self.recoverable_error(&e);
            }
            Err(e) => return Err(AudxError::codec(format!("decode failed: {}", e))),
        };

        let converted = Self::convert_buffer(
            decoded,
            &mut self.converter,
            &mut self.pending,
            self.output,
            self.settings.resampling_quality,
        );

        match converted {
            Ok(chunk) => {
                self.consecutive_errors = 0;
                if !chunk.is_empty() {
                    self.pending.push_back(chunk);
                }
                Ok(self
                    .pending
                    .pop_front()
                    .map_or(ReadOutcome::Skip, ReadOutcome::Chunk))
            }
            Err(e) => self.recoverable_error(&e),
        }
    }
}

impl Drop for SymphoniaDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_nonexistent_file_is_open_error() {
        let result = SymphoniaDecoder::open(
            Path::new("/nonexistent/file.mp3"),
            DecodeSettings::default(),
        );
        assert!(matches!(result, Err(AudxError::Open { .. })));
    }

    #[test]
    fn open_garbage_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.bin");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let result = SymphoniaDecoder::open(&path, DecodeSettings::default());
        assert!(matches!(result, Err(AudxError::Open { .. })));
    }

    fn write_tone(path: &Path, frames: usize) {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * 2 {
            writer.write_sample((i % 512) as i16 * 16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn error_cap_turns_skips_into_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 4096);

        let settings = DecodeSettings {
            max_consecutive_errors: 3,
            ..DecodeSettings::default()
        };
        let mut decoder = SymphoniaDecoder::open(&path, settings).unwrap();
        let bad = SymphoniaError::DecodeError("corrupt frame");
        for _ in 0..3 {
            assert!(matches!(decoder.recoverable_error(&bad), Ok(ReadOutcome::Skip)));
        }
        let err = decoder.recoverable_error(&bad).unwrap_err();
        assert!(matches!(err, AudxError::CodecIo(_)));
        assert!(err.to_string().contains("4 consecutive"));
    }

    #[test]
    fn good_packet_resets_error_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_tone(&path, 44_100);

        let settings = DecodeSettings {
            max_consecutive_errors: 2,
            ..DecodeSettings::default()
        };
        let mut decoder = SymphoniaDecoder::open(&path, settings).unwrap();
        let bad = SymphoniaError::DecodeError("corrupt frame");
        decoder.recoverable_error(&bad).unwrap();
        decoder.recoverable_error(&bad).unwrap();

        while !matches!(decoder.read().unwrap(), ReadOutcome::Chunk(_)) {}
        assert_eq!(decoder.consecutive_errors, 0);
        assert!(matches!(decoder.recoverable_error(&bad), Ok(ReadOutcome::Skip)));
    }

    #[test]
    fn default_settings() {
        let settings = DecodeSettings::default();
        assert_eq!(settings.max_consecutive_errors, DEFAULT_MAX_CONSECUTIVE_ERRORS);
    }
}
