//! `lowpass` and `highpass`: second-order RBJ filters

use super::{FilterNode, NodeContext};
use crate::filter::parser::FilterArgs;
use audx_core::{AudxError, Result};

/// Butterworth Q
const DEFAULT_Q: f64 = 0.707;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiquadKind {
    Lowpass,
    Highpass,
}

impl BiquadKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Lowpass => "lowpass",
            Self::Highpass => "highpass",
        }
    }

    fn default_frequency(self) -> f64 {
        match self {
            Self::Lowpass => 500.0,
            Self::Highpass => 3000.0,
        }
    }
}

/// Normalized coefficients (a0 == 1)
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    fn design(kind: BiquadKind, sample_rate: f64, frequency: f64, q: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * frequency / sample_rate;
        let (sin_omega, cos_omega) = omega.sin_cos();
        let alpha = sin_omega / (2.0 * q);

        let (b0, b1, b2) = match kind {
            BiquadKind::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            BiquadKind::Highpass => {
                let b1 = -(1.0 + cos_omega);
                (-b1 / 2.0, b1, -b1 / 2.0)
            }
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }
}

/// Direct form I history for one channel
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

pub struct BiquadNode {
    kind: BiquadKind,
    coefficients: Coefficients,
    state: Vec<ChannelState>,
}

impl BiquadNode {
    pub fn new(kind: BiquadKind, frequency: f64, q: f64, ctx: &NodeContext) -> Result<Self> {
        let nyquist = f64::from(ctx.sample_rate) / 2.0;
        if !frequency.is_finite() || frequency <= 0.0 || frequency >= nyquist {
            return Err(AudxError::GraphConfig(format!(
                "{}: frequency {} must be in (0, {})",
                kind.name(),
                frequency,
                nyquist
            )));
        }
        if !q.is_finite() || q <= 0.0 {
            return Err(AudxError::GraphConfig(format!(
                "{}: q {} must be positive",
                kind.name(),
                q
            )));
        }

        Ok(Self {
            kind,
            coefficients: Coefficients::design(kind, f64::from(ctx.sample_rate), frequency, q),
            state: vec![ChannelState::default(); ctx.channels],
        })
    }

    pub fn from_args(kind: BiquadKind, args: &FilterArgs, ctx: &NodeContext) -> Result<Self> {
        args.ensure_known(&["f", "frequency", "q"], 2)?;
        let frequency = args
            .get_f64(&["f", "frequency"], 0)?
            .unwrap_or_else(|| kind.default_frequency());
        let q = args.get_f64(&["q"], 1)?.unwrap_or(DEFAULT_Q);
        Self::new(kind, frequency, q, ctx)
    }

    pub fn kind(&self) -> BiquadKind {
        self.kind
    }
}

impl FilterNode for BiquadNode {
    fn name(&self) -> &'static str {
        self.kind.name()
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        let channels = self.state.len();
        let c = self.coefficients;
        let mut out = Vec::with_capacity(input.len());

        for frame in input.chunks(channels) {
            for (x, s) in frame.iter().zip(self.state.iter_mut()) {
                let mut y = c.b0 * x + c.b1 * s.x1 + c.b2 * s.x2 - c.a1 * s.y1 - c.a2 * s.y2;
                // Flush denormals
                if y.abs() < 1e-15 {
                    y = 0.0;
                }
                s.x2 = s.x1;
                s.x1 = *x;
                s.y2 = s.y1;
                s.y1 = y;
                out.push(y);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse_chain;
    use crate::resampling::ResamplingQuality;

    fn ctx(channels: usize) -> NodeContext {
        NodeContext {
            sample_rate: 48_000,
            channels,
            resampling_quality: ResamplingQuality::Fast,
        }
    }

    fn tone(freq: f32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / 48_000.0).sin())
            .collect()
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn lowpass_attenuates_high_tones() {
        let mut lp = BiquadNode::new(BiquadKind::Lowpass, 1000.0, DEFAULT_Q, &ctx(1)).unwrap();
        let low = lp.process(&tone(100.0, 48_000)).unwrap();
        let mut lp = BiquadNode::new(BiquadKind::Lowpass, 1000.0, DEFAULT_Q, &ctx(1)).unwrap();
        let high = lp.process(&tone(10_000.0, 48_000)).unwrap();

        assert!(rms(&low[4800..]) > 0.65);
        assert!(rms(&high[4800..]) < 0.05);
    }

    #[test]
    fn highpass_attenuates_low_tones() {
        let mut hp = BiquadNode::new(BiquadKind::Highpass, 5000.0, DEFAULT_Q, &ctx(1)).unwrap();
        let low = hp.process(&tone(100.0, 48_000)).unwrap();
        assert!(rms(&low[4800..]) < 0.01);
    }

    #[test]
    fn channels_are_filtered_independently() {
        let mut lp = BiquadNode::new(BiquadKind::Lowpass, 1000.0, DEFAULT_Q, &ctx(2)).unwrap();
        let input: Vec<f32> = tone(100.0, 1000).into_iter().flat_map(|s| [s, 0.0]).collect();
        let out = lp.process(&input).unwrap();
        assert!(out.iter().skip(1).step_by(2).all(|s| *s == 0.0));
        assert!(out.iter().step_by(2).any(|s| s.abs() > 0.1));
    }

    #[test]
    fn frequency_must_be_below_nyquist() {
        let args = parse_chain("lowpass=f=30000").unwrap();
        assert!(matches!(
            BiquadNode::from_args(BiquadKind::Lowpass, &args[0], &ctx(2)),
            Err(AudxError::GraphConfig(_))
        ));
        let args = parse_chain("highpass=200:q=0").unwrap();
        assert!(matches!(
            BiquadNode::from_args(BiquadKind::Highpass, &args[0], &ctx(2)),
            Err(AudxError::GraphConfig(_))
        ));
    }
}
