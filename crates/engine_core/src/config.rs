// crates/engine_core/src/config.rs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Initial capacity of each per-tick batch list.
pub const BATCH_CAPACITY_VAR: &str = "BOLT_BATCH_CAPACITY";
/// Minimum number of bolts a worker takes per chunk in the AI init job.
pub const JOB_GRANULARITY_VAR: &str = "BOLT_JOB_GRANULARITY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid spawner config json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{name}={value:?} is not a positive integer")]
    InvalidVar { name: &'static str, value: String },
}

/// Tunables for the bolt spawner. Both values are clamped to at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    pub initial_batch_capacity: usize,
    pub ai_job_granularity: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            initial_batch_capacity: 64,
            ai_job_granularity: 32,
        }
    }
}

impl SpawnerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    /// Defaults, overridden by `BOLT_BATCH_CAPACITY` / `BOLT_JOB_GRANULARITY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = parse_var(&lookup, BATCH_CAPACITY_VAR)? {
            config.initial_batch_capacity = value;
        }
        if let Some(value) = parse_var(&lookup, JOB_GRANULARITY_VAR)? {
            config.ai_job_granularity = value;
        }
        Ok(config.sanitized())
    }

    pub fn sanitized(self) -> Self {
        Self {
            initial_batch_capacity: self.initial_batch_capacity.max(1),
            ai_job_granularity: self.ai_job_granularity.max(1),
        }
    }
}

fn parse_var(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<usize>, ConfigError> {
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidVar { name, value: raw })
}
