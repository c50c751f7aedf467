/// Tracing subscriber setup
use crate::error::{CliError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding filter directives
pub const LOG_ENV: &str = "AUDX_LOG";

/// Directives used when neither the environment nor the config sets any
pub const DEFAULT_FILTER: &str = "audx=info,audx_audio=info";

/// Pick the filter: `AUDX_LOG`, then the config value, then the default
pub fn build_filter(config_filter: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_ENV) {
        return filter;
    }
    config_filter
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, writing to stderr
pub fn init(config_filter: Option<&str>) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(config_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| CliError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_on_bad_directives() {
        if std::env::var_os(LOG_ENV).is_some() {
            return;
        }
        let filter = build_filter(Some("audx=loud"));
        assert_eq!(filter.to_string(), EnvFilter::new(DEFAULT_FILTER).to_string());
    }

    #[test]
    fn config_directives_are_used() {
        if std::env::var_os(LOG_ENV).is_some() {
            return;
        }
        let filter = build_filter(Some("audx=debug"));
        assert!(filter.to_string().contains("audx=debug"));
    }
}
