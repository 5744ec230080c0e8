//! Configuration System
//!
//! File-based configuration with environment variable overrides. Only the
//! origin description and logging knobs live here; per-request state belongs
//! to [`crate::context::RequestContext`].

use crate::error::ConfigError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Description of the upstream origin being proxied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL of the origin service.
    #[serde(default = "default_origin_url")]
    pub origin_url: String,

    /// API path prefix appended to the origin URL.
    #[serde(default = "default_api_path")]
    pub api_path: String,

    /// Step applied when the client omits one.
    #[serde(default = "default_step")]
    pub default_step: String,

    /// Per-fetch time budget.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Oldest value age the cache will serve without refetching, in seconds.
    #[serde(default = "default_max_value_age_secs")]
    pub max_value_age_secs: u64,
}

fn default_origin_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_api_path() -> String {
    "/api/v1".to_string()
}

fn default_step() -> String {
    "60s".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_value_age_secs() -> u64 {
    86_400
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            origin_url: default_origin_url(),
            api_path: default_api_path(),
            default_step: default_step(),
            timeout_secs: default_timeout_secs(),
            max_value_age_secs: default_max_value_age_secs(),
        }
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromdeltaConfig {
    #[serde(default)]
    pub origin: OriginConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PromdeltaConfig {
    /// Load configuration from an optional file plus `PROMDELTA_`-prefixed
    /// environment variables (env wins).
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PROMDELTA")
                .separator("__")
                .try_parsing(true),
        );
        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.origin.origin_url.is_empty() {
            return Err(ConfigError::Invalid("origin_url must not be empty".into()));
        }
        if self.origin.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".into()));
        }
        crate::context::parse_step_ms(&self.origin.default_step)
            .map_err(|_| ConfigError::Invalid(format!(
                "default_step {:?} is not a valid step",
                self.origin.default_step
            )))?;
        Ok(())
    }
}
