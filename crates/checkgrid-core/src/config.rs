//! checkgrid.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckGridConfig {
    pub service: ServiceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the check-execution service, without the environment.
    pub base_url: String,
    /// Environment every request is scoped to.
    pub environment: String,
    /// Per-request timeout (e.g., "30s").
    pub request_timeout: Option<String>,
    /// Session credential sent as a bearer token.
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay before a queued run's history is refreshed (e.g., "10s").
    pub settle_delay: Option<String>,
}

impl CheckGridConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: CheckGridConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config pointing at `base_url`/`environment` with all defaults.
    pub fn new(base_url: &str, environment: &str) -> Self {
        CheckGridConfig {
            service: ServiceConfig {
                base_url: base_url.to_string(),
                environment: environment.to_string(),
                request_timeout: None,
                token: None,
            },
            engine: EngineConfig::default(),
        }
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn request_timeout(&self) -> ConfigResult<Duration> {
        optional_duration(
            "service.request_timeout",
            self.service.request_timeout.as_deref(),
            DEFAULT_REQUEST_TIMEOUT,
        )
    }

    pub fn settle_delay(&self) -> ConfigResult<Duration> {
        optional_duration(
            "engine.settle_delay",
            self.engine.settle_delay.as_deref(),
            DEFAULT_SETTLE_DELAY,
        )
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("service.base_url is empty".to_string()));
        }
        if self.service.environment.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "service.environment is empty".to_string(),
            ));
        }
        self.request_timeout()?;
        self.settle_delay()?;
        Ok(())
    }
}

fn optional_duration(field: &str, raw: Option<&str>, default: Duration) -> ConfigResult<Duration> {
    match raw {
        None => Ok(default),
        Some(s) => parse_duration(s).ok_or_else(|| ConfigError::Duration {
            field: field.to_string(),
            value: s.to_string(),
        }),
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
