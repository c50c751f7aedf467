//! `anull` and `volume`

use super::FilterNode;
use crate::filter::parser::FilterArgs;
use audx_core::{AudxError, Result};

/// Highest accepted linear gain
const MAX_VOLUME: f64 = 100.0;

/// Pass-through
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNode;

impl FilterNode for NullNode {
    fn name(&self) -> &'static str {
        "anull"
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(input.to_vec())
    }
}

/// Constant gain, given as a linear factor or in dB (`volume=0.5`, `volume=-6dB`)
#[derive(Debug, Clone, Copy)]
pub struct VolumeNode {
    gain: f32,
}

impl VolumeNode {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn from_args(args: &FilterArgs) -> Result<Self> {
        args.ensure_known(&["volume"], 1)?;
        let raw = args.get("volume", 0).unwrap_or("1.0").trim();

        let gain = match raw
            .strip_suffix("dB")
            .or_else(|| raw.strip_suffix("db"))
        {
            Some(db) => {
                let db: f64 = db.trim().parse().map_err(|_| {
                    AudxError::GraphParse(format!("volume: invalid value '{}'", raw))
                })?;
                10f64.powf(db / 20.0)
            }
            None => raw.parse::<f64>().map_err(|_| {
                AudxError::GraphParse(format!("volume: invalid value '{}'", raw))
            })?,
        };

        if !gain.is_finite() || !(0.0..=MAX_VOLUME).contains(&gain) {
            return Err(AudxError::GraphConfig(format!(
                "volume: gain {} out of range [0, {}]",
                gain, MAX_VOLUME
            )));
        }

        Ok(Self::new(gain as f32))
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl FilterNode for VolumeNode {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn process(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        Ok(input.iter().map(|s| s * self.gain).collect())
    }
}
