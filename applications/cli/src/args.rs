/// Command-line arguments
use crate::config::AudxConfig;
use crate::error::Result;
use audx_audio::decoder::DecodeSettings;
use audx_audio::encoder::Quality;
use audx_audio::filter::FilterSettings;
use audx_audio::pipeline::PipelineConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "audx")]
#[command(about = "Decode, filter and re-encode an audio file", long_about = None)]
#[command(version, disable_version_flag = true)]
pub struct Args {
    /// Input audio file
    pub input: PathBuf,

    /// Output file; its extension picks the container
    pub output: PathBuf,

    /// Encoder name (libmp3lame, flac, pcm_s16le, libopus, aac); raw PCM when omitted
    #[arg(long, value_name = "NAME")]
    pub codec: Option<String>,

    /// Quality tier: low, medium, high or extreme
    #[arg(long, value_name = "TIER")]
    pub quality: Option<Quality>,

    /// Target bitrate in bits per second, `k` suffix allowed; overrides --quality
    #[arg(long, value_name = "N[k]")]
    pub bitrate: Option<String>,

    /// Filter chain, e.g. "atempo=1.25,volume=0.8"
    #[arg(long, value_name = "CHAIN")]
    pub filter: Option<String>,

    /// Filter chain given positionally (older invocation form)
    #[arg(hide = true, value_name = "CHAIN")]
    pub legacy_filter: Option<String>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,
}

impl Args {
    /// Filter chain, with `--filter` taking precedence over the positional form
    pub fn filter_chain(&self) -> Option<&str> {
        self.filter.as_deref().or(self.legacy_filter.as_deref())
    }

    /// Combine arguments with configuration into a pipeline description
    pub fn pipeline_config(&self, config: &AudxConfig) -> Result<PipelineConfig> {
        let resampling_quality = config.resampling()?;

        let mut pipeline = PipelineConfig::new(&self.input, &self.output);
        pipeline.codec = self.codec.clone();
        pipeline.quality = match self.quality {
            Some(quality) => quality,
            None => config.quality()?,
        };
        pipeline.bitrate = self.bitrate.clone();
        pipeline.filter = self.filter_chain().map(str::to_string);
        pipeline.decode = DecodeSettings {
            max_consecutive_errors: config.max_consecutive_decode_errors,
            resampling_quality,
        };
        pipeline.filter_settings = FilterSettings {
            max_frame_samples: config.filter_frame_samples,
            resampling_quality,
        };
        Ok(pipeline)
    }
}
