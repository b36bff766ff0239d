use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

const DEFAULT_CONFIG: &[u8] = include_bytes!("../config/default.yml");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tuning knobs for a run. Per-run choices live in `ProcessingRequest`.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub worker_count: usize,
    pub chunk_line_limit: usize,
    pub progress_interval_ms: u64,
    pub max_line_bytes: usize,
    pub assumed_chunk_bytes: u64,
    pub channel_capacity_multiplier: usize,
}

impl Config {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("worker_count", self.worker_count as u64),
            ("chunk_line_limit", self.chunk_line_limit as u64),
            ("progress_interval_ms", self.progress_interval_ms),
            ("max_line_bytes", self.max_line_bytes as u64),
            ("assumed_chunk_bytes", self.assumed_chunk_bytes),
            (
                "channel_capacity_multiplier",
                self.channel_capacity_multiplier as u64,
            ),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be greater than 0")));
            }
        }
        Ok(())
    }
}

/// Parse the built-in defaults.
pub fn load_config() -> Result<Config, ConfigError> {
    parse_config(DEFAULT_CONFIG)
}

pub fn parse_config(bytes: &[u8]) -> Result<Config, ConfigError> {
    let config: Config = serde_yaml::from_slice(bytes)?;
    config.validate()?;
    Ok(config)
}
