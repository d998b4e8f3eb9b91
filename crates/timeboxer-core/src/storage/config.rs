//! TOML-based application configuration.
//!
//! Stores user preferences for calendar import and session scoring.
//! Configuration is stored at `~/.config/timeboxer/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::reconcile::ReconcilerConfig;
use crate::session::ScorePolicy;

use super::data_dir;

/// Calendar import configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Whether calendar import is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Days before now included in the event listing window.
    #[serde(default = "default_past_days")]
    pub past_days: i64,
    /// Days after now included in the event listing window.
    #[serde(default = "default_future_days")]
    pub future_days: i64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        ImportConfig {
            enabled: true,
            past_days: default_past_days(),
            future_days: default_future_days(),
        }
    }
}

impl ImportConfig {
    /// The reconciler window this configuration describes.
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            past_days: self.past_days,
            future_days: self.future_days,
        }
    }
}

/// Session scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Points per fully focused minute.
    #[serde(default = "default_points_per_minute")]
    pub points_per_minute: u32,
    /// Bonus for a countdown run that reaches its planned duration.
    #[serde(default = "default_completion_bonus")]
    pub completion_bonus: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            points_per_minute: default_points_per_minute(),
            completion_bonus: default_completion_bonus(),
        }
    }
}

impl ScoringConfig {
    /// The score policy this configuration describes.
    pub fn policy(&self) -> ScorePolicy {
        ScorePolicy {
            points_per_minute: self.points_per_minute,
            completion_bonus: self.completion_bonus,
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/timeboxer/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/timeboxer"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when the file does
    /// not exist yet.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Save the configuration.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })
    }
}


fn default_true() -> bool {
    true
}

fn default_past_days() -> i64 {
    7
}

fn default_future_days() -> i64 {
    30
}

fn default_points_per_minute() -> u32 {
    1
}

fn default_completion_bonus() -> u32 {
    10
}
