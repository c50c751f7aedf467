//! `aresample`: sample rate change inside a graph

use super::{FilterNode, NodeContext};
use crate::filter::parser::FilterArgs;
use crate::resampling::Resampler;
use audx_core::{AudxError, Result};

pub struct ResampleNode {
    output_rate: u32,
    resampler: Option<Resampler>,
}

impl ResampleNode {
    pub fn new(output_rate: u32, ctx: &NodeContext) -> Result<Self> {
        let resampler = if output_rate == ctx.sample_rate {
            None
        } else {
            let resampler = Resampler::new(
                ctx.sample_rate,
                output_rate,
                ctx.channels,
                ctx.resampling_quality,
            )
            .map_err(|e| AudxError::GraphConfig(format!("aresample: {}", e)))?;
            Some(resampler)
        };

        Ok(Self {
            output_rate,
            resampler,
        })
    }

    pub fn from_args(args: &FilterArgs, ctx: &NodeContext) -> Result<Self> {
        args.ensure_known(&["osr", "out_sample_rate"], 1)?;
        let rate = match args.get_f64(&["osr", "out_sample_rate"], 0)? {
            Some(rate) => rate,
            None => {
                return Err(AudxError::GraphConfig(
                    "aresample: missing output sample rate".to_string(),
                ))
            }
        };
        if rate.fract() != 0.0 || !(1.0..=f64::from(u32::MAX)).contains(&rate) {
            return Err(AudxError::GraphConfig(format!(
                "aresample: invalid sample rate {}",
                rate
            )));
        }
        Self::new(rate as u32, ctx)
    }
}

impl FilterNode for ResampleNode {
    fn name(&self) -> &'static str {
        "aresample"
    }

    fn output_rate(&self, _input_rate: u32) -> u32 {
        self.output_rate
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        match &mut self.resampler {
            Some(r) => Ok(r.process(input)?),
            None => Ok(input.to_vec()),
        }
    }

    fn flush(&mut self) -> Result<Vec<f32>> {
        match &mut self.resampler {
            Some(r) => Ok(r.flush()?),
            None => Ok(Vec::new()),
        }
    }
}
