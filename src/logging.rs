//! Logging System
//!
//! Structured logging via the `tracing` crate. All diagnostics go to
//! stderr: stdout is reserved for the single transformed-output artifact,
//! so nothing in the logging stack may write there.

use crate::error::SetupError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    pub level: String,

    /// Output format: json, text (default: text)
    pub format: String,

    /// Enable colored output (text format only)
    pub color: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "off".to_string(),
            format: "text".to_string(),
            color: true,
        }
    }
}

impl LoggingConfig {
    /// Configuration from the CLI switch and environment. `--verbose`
    /// enables debug-level output; `PITH_LOG_FORMAT` selects the format.
    pub fn from_flags(verbose: bool) -> Self {
        let mut config = Self::default();
        if verbose {
            config.level = "debug".to_string();
        }
        if let Ok(format) = std::env::var("PITH_LOG_FORMAT") {
            config.format = format;
        }
        config
    }
}

/// Initialize the logging system.
///
/// Filter precedence (highest to lowest): the `PITH_LOG` environment
/// variable, then the config level.
pub fn init_logging(config: &LoggingConfig) -> Result<(), SetupError> {
    let filter = build_env_filter(config)?;
    let base_subscriber = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => {
            base_subscriber
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        "text" => {
            base_subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(config.color)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        other => return Err(SetupError::InvalidLogFormat(other.to_string())),
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, SetupError> {
    if let Ok(filter) = EnvFilter::try_from_env("PITH_LOG") {
        return Ok(filter);
    }
    config
        .level
        .parse()
        .map_err(|e| SetupError::InvalidLogDirective(format!("{}: {}", config.level, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "off");
        assert_eq!(config.format, "text");
        assert!(config.color);
    }

    #[test]
    fn test_from_flags_verbose_enables_debug() {
        let config = LoggingConfig::from_flags(true);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_invalid_format_rejected() {
        let config = LoggingConfig {
            format: "xml".to_string(),
            ..LoggingConfig::default()
        };
        assert!(matches!(
            init_logging(&config),
            Err(SetupError::InvalidLogFormat(_))
        ));
    }
}
