//! Logging System
//!
//! Structured logging via the `tracing` crate. The decoder itself never logs
//! (errors propagate to the caller); the fetch layer emits debug/warn events
//! through the subscriber configured here.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text (default: text)
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            color: default_true(),
        }
    }
}

/// Initialize the logging system.
///
/// `PROMDELTA_LOG` overrides the configured level filter. Returns an error if
/// a subscriber is already installed.
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), ConfigError> {
    let defaults = LoggingConfig::default();
    let config = config.unwrap_or(&defaults);

    let filter = match std::env::var("PROMDELTA_LOG") {
        Ok(env) => EnvFilter::try_new(env),
        Err(_) => EnvFilter::try_new(&config.level),
    }
    .map_err(|e| ConfigError::Invalid(format!("invalid log filter: {e}")))?;

    let base = Registry::default().with(filter);

    match config.format.as_str() {
        "json" => base
            .with(fmt::layer().json().with_timer(ChronoUtc::rfc_3339()))
            .try_init(),
        "text" => base
            .with(
                fmt::layer()
                    .with_ansi(config.color)
                    .with_timer(ChronoUtc::rfc_3339()),
            )
            .try_init(),
        other => {
            return Err(ConfigError::Invalid(format!(
                "unknown log format {other:?}"
            )))
        }
    }
    .map_err(|e| ConfigError::Invalid(format!("failed to install subscriber: {e}")))
}
