use crate::effort::EffortDuration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_LOOKAHEAD_DAYS: u32 = 3_650;
pub const DEFAULT_DAILY_HOURS: u32 = 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Knobs of the allocation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// How many days an effort-driven allocation may scan before giving up.
    #[serde(default = "default_max_lookahead_days")]
    pub max_lookahead_days: u32,
    /// Working hours of the task calendar used when a task has none.
    #[serde(default = "default_daily_hours")]
    pub default_daily_hours: u32,
}

fn default_max_lookahead_days() -> u32 {
    DEFAULT_MAX_LOOKAHEAD_DAYS
}

fn default_daily_hours() -> u32 {
    DEFAULT_DAILY_HOURS
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_lookahead_days: DEFAULT_MAX_LOOKAHEAD_DAYS,
            default_daily_hours: DEFAULT_DAILY_HOURS,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_lookahead_days == 0 {
            return Err(ConfigError::Invalid(
                "max_lookahead_days must be positive".to_string(),
            ));
        }
        if self.default_daily_hours > 24 {
            return Err(ConfigError::Invalid(format!(
                "default_daily_hours must be at most 24, got {}",
                self.default_daily_hours
            )));
        }
        Ok(())
    }

    pub fn default_daily_effort(&self) -> EffortDuration {
        EffortDuration::hours(u64::from(self.default_daily_hours))
    }
}
