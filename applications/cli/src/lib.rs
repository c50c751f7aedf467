//! audx command-line front end
//!
//! Argument parsing, configuration and logging setup around
//! [`audx_audio::pipeline`]. The binary is a thin wrapper over [`run`].

pub mod args;
pub mod config;
pub mod error;
pub mod logging;

pub use args::Args;
pub use config::AudxConfig;
pub use error::{CliError, Result};

use anyhow::Context;
use audx_audio::pipeline::{self, RunSummary};

/// Transcode one file as described by `args` and `config`
pub fn run(args: &Args, config: &AudxConfig) -> anyhow::Result<RunSummary> {
    let pipeline_config = args
        .pipeline_config(config)
        .context("invalid configuration")?;

    tracing::info!(
        input = %pipeline_config.input.display(),
        output = %pipeline_config.output.display(),
        codec = pipeline_config.codec.as_deref().unwrap_or("raw"),
        quality = %pipeline_config.quality,
        "Starting transcode"
    );

    pipeline::run(&pipeline_config).with_context(|| {
        format!(
            "failed to transcode '{}' to '{}'",
            pipeline_config.input.display(),
            pipeline_config.output.display()
        )
    })
}
