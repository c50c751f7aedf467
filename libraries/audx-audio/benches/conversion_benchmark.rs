//! Performance benchmarks for conversion, filtering and frame alignment
//!
//! Run with: cargo bench -p audx-audio --bench conversion_benchmark

use audx_audio::conversion::FormatConverter;
use audx_audio::encoder::SampleFifo;
use audx_audio::filter::{FilterGraph, FilterSettings, PullOutcome};
use audx_audio::resampling::{Resampler, ResamplingQuality};
use audx_core::{AudioFormat, AudioFrame, ChannelLayout, SampleFormat};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::f32::consts::PI;

/// Generate a test signal (1kHz sine wave)
fn generate_test_signal(sample_rate: u32, duration_secs: f32, channels: usize) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * duration_secs) as usize;
    let mut samples = Vec::with_capacity(num_samples * channels);

    for i in 0..num_samples {
        let t = i as f32 / sample_rate as f32;
        let value = (2.0 * PI * 1000.0 * t).sin() * 0.5;
        for _ in 0..channels {
            samples.push(value);
        }
    }

    samples
}

fn to_s16(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|s| ((s * 32767.0) as i16).to_le_bytes())
        .collect()
}

fn bench_resampling_quality(c: &mut Criterion) {
    let mut group = c.benchmark_group("resampling_quality");
    let channels = 2;
    let input = generate_test_signal(44_100, 1.0, channels);
    group.throughput(Throughput::Elements((input.len() / channels) as u64));

    for quality in [
        ResamplingQuality::Fast,
        ResamplingQuality::Balanced,
        ResamplingQuality::High,
        ResamplingQuality::Maximum,
    ] {
        group.bench_with_input(
            BenchmarkId::new("44.1k->48k", format!("{:?}", quality)),
            &input,
            |b, input| {
                let mut resampler = Resampler::new(44_100, 48_000, channels, quality).unwrap();

                b.iter(|| {
                    resampler.reset();
                    black_box(resampler.process(black_box(input)).unwrap())
                });
            },
        );
    }

    group.finish();
}

fn bench_format_conversion(c: &mut Criterion) {
    let mut group = c.benchmark_group("format_conversion");
    let source = AudioFormat::cd_quality();
    let input = to_s16(&generate_test_signal(44_100, 1.0, 2));
    group.throughput(Throughput::Elements(44_100));

    let targets = [
        ("s16->f32", source.with_sample_format(SampleFormat::F32)),
        ("stereo->mono", AudioFormat::new(44_100, ChannelLayout::MONO, SampleFormat::S16)),
        ("44.1k->48k f32", AudioFormat::new(48_000, ChannelLayout::STEREO, SampleFormat::F32)),
    ];

    for (label, target) in targets {
        group.bench_with_input(BenchmarkId::new(label, ""), &input, |b, input| {
            b.iter(|| {
                let mut converter =
                    FormatConverter::new(source, target, ResamplingQuality::Fast).unwrap();
                black_box(converter.convert_bytes(black_box(input)).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_filter_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_chain");
    let format = AudioFormat::cd_quality();
    let input = to_s16(&generate_test_signal(44_100, 1.0, 2));
    group.throughput(Throughput::Elements(44_100));

    for chain in ["anull", "volume=0.5", "lowpass=f=4000", "atempo=1.25"] {
        group.bench_with_input(BenchmarkId::new("chain", chain), &input, |b, input| {
            b.iter(|| {
                let mut graph = FilterGraph::init(format, chain, FilterSettings::default()).unwrap();
                for (i, block) in input.chunks(1024 * 4).enumerate() {
                    let frame =
                        AudioFrame::new(block.to_vec(), format, block.len() / 4, (i * 1024) as i64)
                            .unwrap();
                    graph.push(&frame).unwrap();
                    while let PullOutcome::Frame(out) = graph.pull().unwrap() {
                        black_box(out);
                    }
                }
                graph.push_eof().unwrap();
                while let PullOutcome::Frame(out) = graph.pull().unwrap() {
                    black_box(out);
                }
            });
        });
    }

    group.finish();
}

fn bench_fifo_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("fifo_alignment");
    let input = to_s16(&generate_test_signal(44_100, 1.0, 2));

    for frame_len in [576, 960, 1152, 4096] {
        group.throughput(Throughput::Elements(44_100));
        group.bench_with_input(BenchmarkId::new("frame_len", frame_len), &input, |b, input| {
            b.iter(|| {
                let mut fifo = SampleFifo::new(4);
                for chunk in input.chunks(1000 * 4) {
                    fifo.write(chunk).unwrap();
                    while fifo.len() >= frame_len {
                        black_box(fifo.read(frame_len));
                    }
                }
                black_box(fifo.read(fifo.len()))
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_resampling_quality,
    bench_format_conversion,
    bench_filter_chains,
    bench_fifo_alignment,
);

criterion_main!(benches);
