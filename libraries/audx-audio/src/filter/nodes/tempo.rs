//! `atempo`: tempo change without pitch change
//!
//! Overlap-add time stretching. Input is cut into Hann-windowed frames taken
//! every `hop * tempo` input samples and laid down every `hop` output samples,
//! with `hop` half a frame so the windows sum to unity. Output length is
//! `ceil(input / tempo)`.

use super::{FilterNode, NodeContext};
use crate::filter::parser::FilterArgs;
use audx_core::{AudxError, Result};
use std::f64::consts::PI;

pub const MIN_TEMPO: f64 = 0.5;
pub const MAX_TEMPO: f64 = 100.0;

/// Window length in seconds
const WINDOW_SECONDS: f64 = 0.046;

pub struct TempoNode {
    tempo: f64,
    channels: usize,
    window: Vec<f32>,
    /// Half the window, in frames
    hop: usize,
    /// Interleaved input not yet fully consumed
    input: Vec<f32>,
    /// Fractional read position into `input`, in frames
    position: f64,
    /// Overlap-add accumulator, one window long
    accumulator: Vec<f32>,
    /// Leading output frames still to discard
    skip: usize,
    frames_in: u64,
    frames_out: u64,
}

impl TempoNode {
    pub fn new(tempo: f64, ctx: &NodeContext) -> Result<Self> {
        if !tempo.is_finite() || !(MIN_TEMPO..=MAX_TEMPO).contains(&tempo) {
            return Err(AudxError::GraphConfig(format!(
                "atempo: tempo {} out of range [{}, {}]",
                tempo, MIN_TEMPO, MAX_TEMPO
            )));
        }

        let window_len = (((f64::from(ctx.sample_rate) * WINDOW_SECONDS) as usize) & !1).max(64);
        let hop = window_len / 2;

        // Periodic Hann: w[i] + w[i + hop] == 1
        let window = (0..window_len)
            .map(|i| (0.5 - 0.5 * (2.0 * PI * i as f64 / window_len as f64).cos()) as f32)
            .collect();

        Ok(Self {
            tempo,
            channels: ctx.channels,
            window,
            hop,
            // Half a window of silence so the first output sample is fully overlapped
            input: vec![0.0; hop * ctx.channels],
            position: 0.0,
            accumulator: vec![0.0; window_len * ctx.channels],
            skip: hop,
            frames_in: 0,
            frames_out: 0,
        })
    }

    pub fn from_args(args: &FilterArgs, ctx: &NodeContext) -> Result<Self> {
        args.ensure_known(&["tempo"], 1)?;
        let tempo = args.get_f64(&["tempo"], 0)?.unwrap_or(1.0);
        Self::new(tempo, ctx)
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    fn input_frames(&self) -> usize {
        self.input.len() / self.channels
    }

    /// Run every window that is fully available in `input`
    fn run_windows(&mut self, out: &mut Vec<f32>, limit: Option<u64>) {
        let window_len = self.window.len();
        let ch = self.channels;

        while self.position as usize + window_len <= self.input_frames() {
            if limit.is_some_and(|l| self.frames_out >= l) {
                break;
            }

            let start = self.position as usize;
            for (i, w) in self.window.iter().enumerate() {
                let src = (start + i) * ch;
                for c in 0..ch {
                    self.accumulator[i * ch + c] += self.input[src + c] * w;
                }
            }

            // The first hop of the accumulator is now complete
            let ready: Vec<f32> = self.accumulator.drain(..self.hop * ch).collect();
            self.accumulator.resize(window_len * ch, 0.0);

            let skip = self.skip.min(self.hop);
            self.skip -= skip;
            let kept = &ready[skip * ch..];
            self.frames_out += (kept.len() / ch) as u64;
            out.extend_from_slice(kept);

            self.position += self.hop as f64 * self.tempo;
            let consumed = (self.position as usize).min(self.input_frames());
            self.input.drain(..consumed * ch);
            self.position -= consumed as f64;
        }
    }

    fn target_frames(&self) -> u64 {
        (self.frames_in as f64 / self.tempo).ceil() as u64
    }
}

impl FilterNode for TempoNode {
    fn name(&self) -> &'static str {
        "atempo"
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() % self.channels != 0 {
            return Err(AudxError::Graph(format!(
                "atempo: {} samples is not a multiple of {} channels",
                input.len(),
                self.channels
            )));
        }
        self.frames_in += (input.len() / self.channels) as u64;
        self.input.extend_from_slice(input);

        let mut out = Vec::new();
        self.run_windows(&mut out, None);
        Ok(out)
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        let target = self.target_frames();
        let mut out = Vec::new();

        // Pad with silence until the tail has passed through every window it touches
        let window_len = self.window.len();
        let mut rounds = 0;
        while self.frames_out < target && rounds < 4 {
            let stride = (self.hop as f64 * self.tempo).ceil() as usize;
            let pad = (window_len + stride * 2) * self.channels;
            self.input.resize(self.input.len() + pad, 0.0);
            self.run_windows(&mut out, Some(target));
            rounds += 1;
        }

        if self.frames_out > target {
            let excess = ((self.frames_out - target) as usize).min(out.len() / self.channels);
            out.truncate(out.len() - excess * self.channels);
            self.frames_out -= excess as u64;
        }

        self.input.clear();
        Ok(out)
    }
}
