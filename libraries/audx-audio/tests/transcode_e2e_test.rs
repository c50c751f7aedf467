//! End-to-end transcoding tests
//!
//! Each test writes a WAV fixture, runs the full pipeline against it and
//! inspects the file that comes out.
//!
//! Run with: cargo test -p audx-audio --features test-utils --test transcode_e2e_test

#![cfg(feature = "test-utils")]

use audx_audio::decoder::{DecodeSettings, SymphoniaDecoder};
use audx_audio::encoder::Quality;
use audx_audio::pipeline::{self, PipelineConfig};
use audx_audio::test_utils::analysis::*;
use audx_audio::test_utils::signals::*;
use audx_core::{AudioSource, AudxError, ErrorCategory, ReadOutcome};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SAMPLE_RATE: u32 = 44_100;

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    samples: Vec<f32>,
}

impl Fixture {
    /// One second of 440 Hz stereo sine
    fn stereo_sine() -> Self {
        Self::stereo_sine_samples(SAMPLE_RATE as usize)
    }

    fn stereo_sine_samples(len: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.wav");
        let samples = generate_sine_wave(440.0, SAMPLE_RATE, 2, len, 0.5);
        write_wav_fixture(&input, SAMPLE_RATE, 2, &samples).unwrap();
        Self { dir, input, samples }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn decode_all(path: &Path) -> (SymphoniaDecoder, Vec<u8>) {
    let mut decoder = SymphoniaDecoder::open(path, DecodeSettings::default()).unwrap();
    let mut bytes = Vec::new();
    loop {
        match decoder.read().unwrap() {
            ReadOutcome::Chunk(chunk) => bytes.extend_from_slice(chunk.as_bytes()),
            ReadOutcome::Skip => {}
            ReadOutcome::EndOfStream => break,
        }
    }
    (decoder, bytes)
}

#[test]
fn raw_output_is_byte_exact_copy_of_pcm_input() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.pcm");

    let summary = pipeline::run(&PipelineConfig::new(&fixture.input, &output)).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len(), SAMPLE_RATE as usize * 2 * 2);
    assert_eq!(written, to_s16_bytes(&fixture.samples));
    assert_eq!(summary.samples_decoded, u64::from(SAMPLE_RATE));
    assert_eq!(summary.samples_dispatched, u64::from(SAMPLE_RATE));
    assert_eq!(summary.failed_writes, 0);
}

#[test]
fn unreadable_input_fails_before_output_exists() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    std::fs::write(&input, "definitely not audio\n".repeat(64)).unwrap();
    let output = dir.path().join("out.pcm");

    let err = pipeline::run(&PipelineConfig::new(&input, &output)).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Open);
    assert!(!output.exists());
}

#[test]
fn missing_input_reports_open_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = PipelineConfig::new(dir.path().join("missing.flac"), dir.path().join("out.pcm"));
    assert!(matches!(pipeline::run(&config), Err(AudxError::Open { .. })));
}

#[test]
fn container_without_audio_reports_no_audio_stream() {
    use ogg::writing::{PacketWriteEndInfo, PacketWriter};

    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("data.ogg");
    {
        let mut writer = PacketWriter::new(std::fs::File::create(&input).unwrap());
        writer
            .write_packet(b"\x00custom-data".to_vec(), 0x5eed, PacketWriteEndInfo::EndPage, 0)
            .unwrap();
        writer
            .write_packet(vec![7u8; 64], 0x5eed, PacketWriteEndInfo::EndStream, 1)
            .unwrap();
    }
    let output = dir.path().join("out.pcm");

    match pipeline::run(&PipelineConfig::new(&input, &output)) {
        Err(err @ AudxError::NoAudioStream(_)) => assert_eq!(err.category(), ErrorCategory::Open),
        other => panic!("expected NoAudioStream, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn malformed_bitrate_is_rejected_before_anything_opens() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.mp3");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("libmp3lame".to_string());
    config.bitrate = Some("abc".to_string());

    assert!(matches!(
        pipeline::run(&config),
        Err(AudxError::InvalidBitrate(ref b)) if b == "abc"
    ));
    assert!(!output.exists());
}

#[test]
fn unknown_encoder_is_reported_by_name() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.mp3");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("libvorbis".to_string());

    match pipeline::run(&config) {
        Err(AudxError::EncoderNotFound(msg)) => assert!(msg.contains("libvorbis")),
        other => panic!("expected EncoderNotFound, got {other:?}"),
    }
    assert!(!output.exists());
}

#[test]
fn unsupported_extension_creates_no_file() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.xyz");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("flac".to_string());

    assert!(matches!(pipeline::run(&config), Err(AudxError::UnsupportedFormat(_))));
    assert!(!output.exists());
}

#[test]
fn double_tempo_halves_raw_output() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("fast.pcm");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.filter = Some("atempo=2.0".to_string());

    pipeline::run(&config).unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.len() / 4, SAMPLE_RATE as usize / 2);
}

#[test]
fn volume_filter_scales_level() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("quiet.pcm");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.filter = Some("volume=0.5".to_string());

    pipeline::run(&config).unwrap();

    let written = s16_bytes_to_f32(&std::fs::read(&output).unwrap());
    let ratio = calculate_peak(&written) / calculate_peak(&fixture.samples);
    assert!((ratio - 0.5).abs() < 0.01, "peak ratio {ratio}");
}

#[test]
fn resample_filter_changes_raw_length() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("48k.pcm");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.filter = Some("aresample=48000".to_string());

    pipeline::run(&config).unwrap();

    let frames = std::fs::read(&output).unwrap().len() / 4;
    let expected = 48_000usize;
    assert!(frames.abs_diff(expected) <= expected / 100, "got {frames} frames");
}

#[test]
fn invalid_filter_chain_creates_no_file() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.pcm");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.filter = Some("reverb=big".to_string());

    assert!(matches!(pipeline::run(&config), Err(AudxError::GraphParse(_))));
    assert!(!output.exists());
}

#[test]
fn wav_output_round_trips_samples() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("copy.wav");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("pcm_s16le".to_string());

    pipeline::run(&config).unwrap();

    let mut reader = hound::WavReader::open(&output).unwrap();
    assert_eq!(reader.spec().sample_rate, SAMPLE_RATE);
    assert_eq!(reader.spec().channels, 2);
    let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    assert_eq!(samples, to_i16_samples(&fixture.samples));
}

#[test]
fn flac_output_is_lossless() {
    let fixture = Fixture::stereo_sine();
    let output = fixture.output("out.flac");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("flac".to_string());
    config.quality = Quality::Extreme;

    pipeline::run(&config).unwrap();

    let (decoder, decoded) = decode_all(&output);
    assert_eq!(decoder.info().sample_rate, SAMPLE_RATE);
    assert_eq!(decoder.info().channels, 2);
    assert_eq!(decoded, to_s16_bytes(&fixture.samples));
}

#[test]
fn flac_with_short_final_block_decodes_exactly() {
    // Two full 4096-sample blocks and one of 1808
    let fixture = Fixture::stereo_sine_samples(10_000);
    let output = fixture.output("short.flac");
    let mut config = PipelineConfig::new(&fixture.input, &output);
    config.codec = Some("flac".to_string());

    let summary = pipeline::run(&config).unwrap();
    assert_eq!(summary.samples_dispatched, 10_000);

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..4], b"fLaC");
    assert_eq!(&bytes[8..12], &[0x10, 0x00, 0x10, 0x00]);

    let (_, decoded) = decode_all(&output);
    assert_eq!(decoded.len(), 10_000 * 4);
    assert_eq!(decoded, to_s16_bytes(&fixture.samples));
}

#[cfg(feature = "mp3")]
mod mp3 {
    use super::*;

    const MPEG1_LAYER3_KBPS: [u32; 15] = [0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320];

    /// Bitrate index of every frame header, walking frame by frame
    fn frame_bitrate_indices(bytes: &[u8]) -> Vec<usize> {
        let mut indices = Vec::new();
        let mut pos = 0;
        while pos + 4 <= bytes.len() {
            let is_sync = bytes[pos] == 0xFF && bytes[pos + 1] & 0xE0 == 0xE0;
            let index = usize::from(bytes[pos + 2] >> 4);
            if !is_sync || index == 0 || index >= MPEG1_LAYER3_KBPS.len() {
                pos += 1;
                continue;
            }
            let padding = usize::from((bytes[pos + 2] >> 1) & 1);
            let len = (144_000 * MPEG1_LAYER3_KBPS[index] / SAMPLE_RATE) as usize + padding;
            indices.push(index);
            pos += len;
        }
        indices
    }

    #[test]
    fn high_quality_mp3_uses_256k_frames() {
        let fixture = Fixture::stereo_sine();
        let output = fixture.output("out.mp3");
        let mut config = PipelineConfig::new(&fixture.input, &output);
        config.codec = Some("libmp3lame".to_string());
        config.quality = Quality::High;

        pipeline::run(&config).unwrap();

        let bytes = std::fs::read(&output).unwrap();
        let indices = frame_bitrate_indices(&bytes);
        assert!(indices.len() > 30, "only {} frames", indices.len());
        // Bitrate index 13 is 256 kb/s
        assert!(indices[1..].iter().all(|&i| i == 13), "{indices:?}");

        let (decoder, decoded) = decode_all(&output);
        assert_eq!(decoder.info().sample_rate, SAMPLE_RATE);
        assert_eq!(decoder.info().channels, 2);
        let rms = calculate_rms(&s16_bytes_to_f32(&decoded));
        assert!(rms > 0.25, "decoded rms {rms}");
    }

    #[test]
    fn explicit_bitrate_overrides_quality() {
        let fixture = Fixture::stereo_sine();
        let output = fixture.output("low.mp3");
        let mut config = PipelineConfig::new(&fixture.input, &output);
        config.codec = Some("libmp3lame".to_string());
        config.quality = Quality::Extreme;
        config.bitrate = Some("128k".to_string());

        pipeline::run(&config).unwrap();

        let indices = frame_bitrate_indices(&std::fs::read(&output).unwrap());
        // Bitrate index 9 is 128 kb/s
        assert!(indices[1..].iter().all(|&i| i == 9), "{indices:?}");
    }
}
