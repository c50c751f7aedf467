/// Runtime configuration
///
/// Sources, lowest precedence first: built-in defaults, `audx.toml` in the
/// working directory (or the file named by `AUDX_CONFIG`), then `AUDX_*`
/// environment variables. Command-line flags override all of them.
use crate::error::{CliError, Result};
use audx_audio::encoder::Quality;
use audx_audio::resampling::ResamplingQuality;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "AUDX_CONFIG";

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "audx.toml";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudxConfig {
    /// `tracing` filter directives, used when `AUDX_LOG` is unset
    #[serde(default)]
    pub log_filter: Option<String>,

    /// Quality tier when `--quality` is not given
    #[serde(default = "default_quality")]
    pub default_quality: String,

    /// Resampler preset for every format conversion
    #[serde(default = "default_resampling_quality")]
    pub resampling_quality: String,

    /// Back-to-back undecodable packets tolerated before giving up
    #[serde(default = "default_max_consecutive_decode_errors")]
    pub max_consecutive_decode_errors: usize,

    /// Largest frame pulled from the filter graph, in samples per channel
    #[serde(default = "default_filter_frame_samples")]
    pub filter_frame_samples: usize,
}

impl Default for AudxConfig {
    fn default() -> Self {
        Self {
            log_filter: None,
            default_quality: default_quality(),
            resampling_quality: default_resampling_quality(),
            max_consecutive_decode_errors: default_max_consecutive_decode_errors(),
            filter_frame_samples: default_filter_frame_samples(),
        }
    }
}

impl AudxConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::load_from(Some(&PathBuf::from(path)), true),
            None => Self::load_from(Some(Path::new(DEFAULT_CONFIG_FILE)), false),
        }
    }

    /// Load from `path` plus the environment
    ///
    /// A missing file is an error only when `required` is set.
    pub fn load_from(path: Option<&Path>, required: bool) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if required && !path.exists() {
                return Err(CliError::Config(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            settings = settings.add_source(config::File::from(path).required(required));
        }

        // Override with environment variables (prefixed with AUDX_)
        settings = settings.add_source(config::Environment::with_prefix("AUDX").try_parsing(true));

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_consecutive_decode_errors == 0 {
            return Err(CliError::Config(
                "max_consecutive_decode_errors must be at least 1".to_string(),
            ));
        }
        if self.filter_frame_samples == 0 {
            return Err(CliError::Config(
                "filter_frame_samples must be at least 1".to_string(),
            ));
        }
        self.quality()?;
        self.resampling()?;
        Ok(())
    }

    /// Parsed `default_quality`
    pub fn quality(&self) -> Result<Quality> {
        self.default_quality
            .parse()
            .map_err(|e| CliError::Config(format!("default_quality: {}", e)))
    }

    /// Parsed `resampling_quality`
    pub fn resampling(&self) -> Result<ResamplingQuality> {
        self.resampling_quality
            .parse()
            .map_err(|e| CliError::Config(format!("resampling_quality: {}", e)))
    }
}

// Default values
fn default_quality() -> String {
    Quality::default().as_str().to_string()
}

fn default_resampling_quality() -> String {
    "high".to_string()
}

fn default_max_consecutive_decode_errors() -> usize {
    audx_audio::decoder::DEFAULT_MAX_CONSECUTIVE_ERRORS
}

fn default_filter_frame_samples() -> usize {
    audx_audio::filter::DEFAULT_MAX_FRAME_SAMPLES
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audx.toml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn defaults_are_valid() {
        let config = AudxConfig::default();
        config.validate().unwrap();
        assert_eq!(config.quality().unwrap(), Quality::High);
        assert_eq!(config.resampling().unwrap(), ResamplingQuality::High);
        assert_eq!(config.max_consecutive_decode_errors, 32);
        assert_eq!(config.filter_frame_samples, 1024);
    }

    #[test]
    fn missing_optional_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AudxConfig::load_from(Some(&dir.path().join("absent.toml")), false).unwrap();
        assert_eq!(config.default_quality, "high");
    }

    #[test]
    fn missing_required_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudxConfig::load_from(Some(&dir.path().join("absent.toml")), true).unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
    }

    #[test]
    fn file_values_are_read() {
        let (_dir, path) = write_config(
            r#"
log_filter = "audx=debug"
default_quality = "extreme"
resampling_quality = "fast"
filter_frame_samples = 512
"#,
        );
        let config = AudxConfig::load_from(Some(&path), true).unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("audx=debug"));
        assert_eq!(config.quality().unwrap(), Quality::Extreme);
        assert_eq!(config.resampling().unwrap(), ResamplingQuality::Fast);
        assert_eq!(config.filter_frame_samples, 512);
        assert_eq!(config.max_consecutive_decode_errors, 32);
    }

    #[test]
    fn zero_limits_are_rejected() {
        let (_dir, path) = write_config("max_consecutive_decode_errors = 0\n");
        assert!(matches!(
            AudxConfig::load_from(Some(&path), true),
            Err(CliError::Config(_))
        ));

        let (_dir, path) = write_config("filter_frame_samples = 0\n");
        assert!(matches!(
            AudxConfig::load_from(Some(&path), true),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn unknown_quality_is_rejected() {
        let (_dir, path) = write_config("default_quality = \"ultra\"\n");
        let err = AudxConfig::load_from(Some(&path), true).unwrap_err();
        assert!(err.to_string().contains("default_quality"));
    }
}
