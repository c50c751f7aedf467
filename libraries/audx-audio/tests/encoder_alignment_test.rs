//! Frame alignment tests for the encode adapter
//!
//! Arbitrary input chunking must reach the encoder as full frames plus at
//! most one short frame at the flush, with gap-free timestamps.

#![cfg(feature = "test-utils")]

use audx_audio::encoder::{EncodeAdapter, EncoderSettings, Quality, SampleFifo, TimestampCounter};
use audx_audio::test_utils::signals::*;
use audx_core::{AudioFormat, AudioFrame, AudxError};
use proptest::prelude::*;

fn pcm_settings() -> EncoderSettings {
    EncoderSettings::resolve("pcm_s16le", Quality::High, None).unwrap()
}

fn frame(samples: &[f32], pts: i64) -> AudioFrame {
    let format = AudioFormat::cd_quality();
    let count = samples.len() / format.channels();
    AudioFrame::new(to_s16_bytes(samples), format, count, pts).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn packets_are_whole_frames_plus_one_remainder(
        chunks in prop::collection::vec(1usize..3000, 1..12)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pcm");
        let mut enc = EncodeAdapter::open(&path, AudioFormat::cd_quality(), pcm_settings()).unwrap();
        let frame_len = enc.frame_len();

        let mut total = 0usize;
        for len in &chunks {
            let samples = generate_sine_wave(220.0, 44_100, 2, *len, 0.25);
            enc.write(Some(&frame(&samples, total as i64))).unwrap();
            total += len;
            prop_assert_eq!(enc.packets_written() as usize, total / frame_len);
        }
        enc.finalize().unwrap();

        let expected = total / frame_len + usize::from(total % frame_len != 0);
        prop_assert_eq!(enc.packets_written() as usize, expected);
        prop_assert_eq!(enc.samples_sent(), total as i64);
        prop_assert_eq!(std::fs::metadata(&path).unwrap().len() as usize, total * 4);
    }

    #[test]
    fn fifo_preserves_byte_order_across_reads(
        writes in prop::collection::vec(0usize..500, 1..10),
        read_len in 1usize..700
    ) {
        let mut fifo = SampleFifo::new(4);
        let mut expected = Vec::new();
        let mut seen = Vec::new();
        let mut counter = 0u8;

        for n in writes {
            let bytes: Vec<u8> = (0..n * 4)
                .map(|_| {
                    counter = counter.wrapping_add(1);
                    counter
                })
                .collect();
            prop_assert_eq!(fifo.write(&bytes).unwrap(), n);
            expected.extend_from_slice(&bytes);
            while fifo.len() >= read_len {
                seen.extend(fifo.read(read_len));
            }
        }
        let rest = fifo.len();
        seen.extend(fifo.read(rest));

        prop_assert!(fifo.is_empty());
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn timestamps_are_contiguous(lengths in prop::collection::vec(1usize..5000, 1..20)) {
        let mut counter = TimestampCounter::new();
        let mut previous_end = 0i64;
        for len in lengths {
            let pts = counter.advance(len);
            prop_assert_eq!(pts, previous_end);
            previous_end = pts + len as i64;
        }
        prop_assert_eq!(counter.value(), previous_end);
    }
}

#[test]
fn partial_sample_is_rejected_whole() {
    let mut fifo = SampleFifo::new(4);
    match fifo.write(&[0u8; 6]) {
        Err(AudxError::FifoWrite { offered, accepted }) => {
            assert_eq!(accepted, 0);
            assert!(offered > 0);
        }
        other => panic!("expected FifoWrite, got {other:?}"),
    }
    assert!(fifo.is_empty());
}

#[test]
fn flac_gets_one_short_frame_at_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.flac");
    let settings = EncoderSettings::resolve("flac", Quality::Medium, None).unwrap();
    let mut enc = EncodeAdapter::open(&path, AudioFormat::cd_quality(), settings).unwrap();
    assert_eq!(enc.frame_len(), 4096);

    let samples = generate_sine_wave(440.0, 44_100, 2, 10_000, 0.5);
    enc.write(Some(&frame(&samples, 0))).unwrap();
    enc.finalize().unwrap();

    assert_eq!(enc.samples_sent(), 10_000);
    assert_eq!(enc.packets_written(), 3);
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"fLaC");
}

#[test]
fn frames_after_flush_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.pcm");
    let mut enc = EncodeAdapter::open(&path, AudioFormat::cd_quality(), pcm_settings()).unwrap();

    enc.write(None).unwrap();
    let samples = generate_silence(2, 64);
    assert!(matches!(
        enc.write(Some(&frame(&samples, 0))),
        Err(AudxError::InvalidState(_))
    ));
    enc.finalize().unwrap();
}
