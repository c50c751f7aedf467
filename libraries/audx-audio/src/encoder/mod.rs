//! Sample-Aligning Encode Adapter
//!
//! Accepts PCM frames of any length, converts them to the encoder's native
//! format, and queues them in a [`SampleFifo`] so the encoder only ever sees
//! frames of exactly its frame size. The last frame before the flush may be
//! shorter. Every frame is stamped with a [`TimestampCounter`], and packets are
//! rescaled from the encoder time base to the container's before writing.

mod fifo;
mod flac;
mod pcm;
mod quality;

#[cfg(feature = "aac")]
mod aac;
#[cfg(feature = "mp3")]
mod mp3;
#[cfg(feature = "opus")]
mod opus;

pub use fifo::{SampleFifo, TimestampCounter};
pub use quality::{parse_bitrate, CodecFamily, EncoderSettings, Quality, RateControl};

use crate::conversion::FormatConverter;
use crate::mux::{create_muxer, ContainerKind};
use audx_core::{AudioFormat, AudioFrame, AudxError, EncoderBackend, Muxer, Result, TimeBase};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Batch length for encoders that accept any frame length
pub const VARIABLE_FRAME_BATCH: usize = 1024;

/// Encoder names this build can construct
pub fn available_encoders() -> Vec<&'static str> {
    let mut names = vec![flac::NAME, pcm::NAME];
    #[cfg(feature = "mp3")]
    names.push(mp3::NAME);
    #[cfg(feature = "opus")]
    names.push(opus::NAME);
    #[cfg(feature = "aac")]
    names.push(aac::NAME);
    names.sort_unstable();
    names
}

/// Build the backend for `settings.codec`, sized for `source`
pub fn find_encoder(source: AudioFormat, settings: &EncoderSettings) -> Result<Box<dyn EncoderBackend>> {
    match settings.codec.as_str() {
        flac::NAME => Ok(Box::new(flac::FlacEncoder::new(source, settings)?)),
        pcm::NAME => Ok(Box::new(pcm::PcmEncoder::new(source, settings)?)),
        #[cfg(feature = "mp3")]
        mp3::NAME => Ok(Box::new(mp3::Mp3Encoder::new(source, settings)?)),
        #[cfg(feature = "opus")]
        opus::NAME => Ok(Box::new(opus::OpusEncoder::new(source, settings)?)),
        #[cfg(feature = "aac")]
        aac::NAME => Ok(Box::new(aac::AacEncoder::new(source, settings)?)),
        other => Err(AudxError::EncoderNotFound(format!(
            "{} (available: {})",
            other,
            available_encoders().join(", ")
        ))),
    }
}

/// Encoder, FIFO and container writer for one output file
pub struct EncodeAdapter {
    path: PathBuf,
    backend: Option<Box<dyn EncoderBackend>>,
    muxer: Option<Box<dyn Muxer>>,
    converter: Option<FormatConverter>,
    fifo: SampleFifo,
    frame_len: usize,
    native: AudioFormat,
    encoder_time_base: TimeBase,
    stream_time_base: TimeBase,
    timestamp: TimestampCounter,
    settings: EncoderSettings,
    packets_written: u64,
    flushed: bool,
    finalized: bool,
}

impl EncodeAdapter {
    /// Validate the encoder configuration, then create the output file
    ///
    /// `source` is the format frames will arrive in; it picks the encoder's
    /// native rate and channel count.
    pub fn open(destination: &Path, source: AudioFormat, settings: EncoderSettings) -> Result<Self> {
        let backend = find_encoder(source, &settings)?;
        let container = ContainerKind::resolve(destination, backend.name())?;

        let params = backend.parameters();
        let native = backend.input_format();
        let frame_len = backend.frame_size().unwrap_or(VARIABLE_FRAME_BATCH);
        let encoder_time_base = backend.time_base();

        let mut muxer = create_muxer(container, destination, &params)?;
        muxer.write_header()?;
        let stream_time_base = muxer.stream_time_base();

        info!(
            codec = backend.name(),
            format = %native,
            bit_rate = ?params.bit_rate,
            frame_size = frame_len,
            container = ?container,
            "Encoder opened"
        );

        Ok(Self {
            path: destination.to_path_buf(),
            backend: Some(backend),
            muxer: Some(muxer),
            converter: None,
            fifo: SampleFifo::new(native.bytes_per_frame()),
            frame_len,
            native,
            encoder_time_base,
            stream_time_base,
            timestamp: TimestampCounter::new(),
            settings,
            packets_written: 0,
            flushed: false,
            finalized: false,
        })
    }

    /// Output path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format the encoder consumes
    pub fn native_format(&self) -> AudioFormat {
        self.native
    }

    /// Samples per encoder frame (the batch length for variable encoders)
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Samples sent to the encoder so far
    pub fn samples_sent(&self) -> i64 {
        self.timestamp.value()
    }

    /// Packets handed to the container so far
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Feed a frame, or `None` to flush everything into the encoder
    pub fn write(&mut self, frame: Option<&AudioFrame>) -> Result<()> {
        if self.flushed {
            return Err(AudxError::invalid_state("encoder already flushed"));
        }
        match frame {
            Some(frame) => self.write_frame(frame),
            None => self.flush(),
        }
    }

    /// Flush the encoder and write the container trailer
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Err(AudxError::invalid_state("output already finalized"));
        }

        if !self.flushed {
            self.flush().map_err(AudxError::finalize)?;
        }
        self.muxer_mut()
            .and_then(|m| m.write_trailer())
            .map_err(AudxError::finalize)?;

        self.finalized = true;
        info!(
            path = %self.path.display(),
            samples = self.timestamp.value(),
            packets = self.packets_written,
            "Output finalized"
        );
        self.close();
        Ok(())
    }

    /// Release the encoder and container; safe to call more than once
    pub fn close(&mut self) {
        self.converter = None;
        self.backend = None;
        self.muxer = None;
        self.fifo.clear();
    }

    fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        if self.converter.is_none() {
            let c = FormatConverter::new(frame.format(), self.native, self.settings.resampling_quality)?;
            debug!(from = %frame.format(), to = %self.native, "Encoder input converter created");
            self.converter = Some(c);
        }
        let Some(converter) = self.converter.as_mut() else {
            return Err(AudxError::invalid_state("encoder closed"));
        };
        if converter.input_format() != frame.format() {
            return Err(AudxError::conversion(format!(
                "frame format {} differs from stream format {}",
                frame.format(),
                converter.input_format()
            )));
        }
        let converted = converter.convert_bytes(frame.as_bytes())?;

        self.fifo.write(converted.as_bytes())?;
        self.drain_full_frames()
    }

    fn flush(&mut self) -> Result<()> {
        self.flushed = true;

        if let Some(converter) = &mut self.converter {
            let tail = converter.flush()?;
            self.fifo.write(tail.as_bytes())?;
        }
        self.drain_full_frames()?;

        if !self.fifo.is_empty() {
            let remaining = self.fifo.len();
            self.send_samples(remaining)?;
        }

        self.backend_mut()?.send_frame(None)?;
        self.receive_packets()
    }

    fn drain_full_frames(&mut self) -> Result<()> {
        while self.fifo.len() >= self.frame_len {
            self.send_samples(self.frame_len)?;
        }
        Ok(())
    }

    fn send_samples(&mut self, count: usize) -> Result<()> {
        let data = self.fifo.read(count);
        let pts = self.timestamp.advance(count);
        let frame = AudioFrame::new(data, self.native, count, pts)?;
        self.backend_mut()?.send_frame(Some(&frame))?;
        self.receive_packets()
    }

    fn receive_packets(&mut self) -> Result<()> {
        while let Some(packet) = self.backend_mut()?.receive_packet()? {
            let packet = packet.rescaled(self.encoder_time_base, self.stream_time_base);
            self.muxer_mut()?.write_packet(&packet)?;
            self.packets_written += 1;
        }
        Ok(())
    }

    fn backend_mut(&mut self) -> Result<&mut Box<dyn EncoderBackend>> {
        self.backend
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("encoder closed"))
    }

    fn muxer_mut(&mut self) -> Result<&mut Box<dyn Muxer>> {
        self.muxer
            .as_mut()
            .ok_or_else(|| AudxError::invalid_state("container closed"))
    }
}

impl Drop for EncodeAdapter {
    fn drop(&mut self) {
        if !self.finalized && self.backend.is_some() {
            warn!(path = %self.path.display(), "Encoder dropped without finalize");
        }
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use audx_core::{ChannelLayout, SampleFormat};

    fn pcm_settings() -> EncoderSettings {
        EncoderSettings::resolve("pcm_s16le", Quality::High, None).unwrap()
    }

    fn frame(format: AudioFormat, samples: usize, pts: i64) -> AudioFrame {
        let data = (0..samples * format.channels())
            .flat_map(|i| (i as i16).to_le_bytes())
            .collect();
        AudioFrame::new(data, format, samples, pts).unwrap()
    }

    #[test]
    fn unknown_encoder_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.mp3");
        let settings = EncoderSettings {
            codec: "vorbis".to_string(),
            ..pcm_settings()
        };
        assert!(matches!(
            EncodeAdapter::open(&path, AudioFormat::cd_quality(), settings),
            Err(AudxError::EncoderNotFound(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn container_mismatch_creates_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.ogg");
        assert!(matches!(
            EncodeAdapter::open(&path, AudioFormat::cd_quality(), pcm_settings()),
            Err(AudxError::UnsupportedFormat(_))
        ));
        assert!(!path.exists());
    }

    #[test]
    fn variable_encoder_batches_and_flushes_remainder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcm");
        let format = AudioFormat::cd_quality();
        let mut enc = EncodeAdapter::open(&path, format, pcm_settings()).unwrap();
        assert_eq!(enc.frame_len(), VARIABLE_FRAME_BATCH);

        enc.write(Some(&frame(format, 1000, 0))).unwrap();
        assert_eq!(enc.packets_written(), 0);
        enc.write(Some(&frame(format, 1500, 1000))).unwrap();
        assert_eq!(enc.packets_written(), 2);
        enc.finalize().unwrap();
        assert_eq!(enc.packets_written(), 3);
        assert_eq!(enc.samples_sent(), 2500);

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2500 * 4);
    }

    #[test]
    fn second_finalize_is_invalid_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let mut enc = EncodeAdapter::open(&path, AudioFormat::cd_quality(), pcm_settings()).unwrap();
        enc.finalize().unwrap();
        assert!(matches!(enc.finalize(), Err(AudxError::InvalidState(_))));
        assert!(matches!(enc.write(None), Err(AudxError::InvalidState(_))));
    }

    #[test]
    fn converts_to_native_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let source = AudioFormat::new(44_100, ChannelLayout::STEREO, SampleFormat::F32);
        let mut enc = EncodeAdapter::open(&path, source, pcm_settings()).unwrap();
        assert_eq!(enc.native_format().sample_format, SampleFormat::S16);

        let data: Vec<u8> = std::iter::repeat(0.5f32.to_le_bytes())
            .take(2048 * 2)
            .flatten()
            .collect();
        enc.write(Some(&AudioFrame::new(data, source, 2048, 0).unwrap())).unwrap();
        enc.finalize().unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.duration(), 2048);
        assert!(reader.samples::<i16>().all(|s| s.unwrap() == 16384));
    }

    #[test]
    fn available_encoders_always_include_builtins() {
        let names = available_encoders();
        assert!(names.contains(&"flac"));
        assert!(names.contains(&"pcm_s16le"));
    }
}
