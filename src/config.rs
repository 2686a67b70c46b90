//! Application configuration, loaded from JSON
//!
//! Every section and field has a default, so an empty object (or no file
//! at all) is a valid configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::audio::AudioConfig;
use crate::logging::LogConfig;
use crate::sonify::{RollConfig, VerticalConfig};
use crate::transport::TransportConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SonifierConfig {
    pub audio: AudioConfig,
    pub roll: RollConfig,
    pub vertical: VerticalConfig,
    pub transport: TransportConfig,
    pub log: LogConfig,
}

impl SonifierConfig {
    /// Load from `path`, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_json(&fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field, message: &str| {
            Err(ConfigError::Invalid {
                field,
                message: message.to_string(),
            })
        };

        if !(self.roll.max_angle_deg > 0.0) {
            return invalid("roll.max_angle_deg", "must be positive");
        }
        if !(self.roll.frequency_hz > 0.0) {
            return invalid("roll.frequency_hz", "must be positive");
        }
        if !(self.vertical.descend_hz > 0.0 && self.vertical.climb_hz > 0.0) {
            return invalid("vertical.descend_hz/climb_hz", "must be positive");
        }
        if !(self.vertical.dead_zone >= 0.0 && self.vertical.dead_zone < self.vertical.saturation) {
            return invalid("vertical.dead_zone", "must be >= 0 and below vertical.saturation");
        }
        if !(0.0..=1.0).contains(&self.vertical.volume) {
            return invalid("vertical.volume", "must be within 0.0 - 1.0");
        }
        if self.transport.url.is_empty() {
            return invalid("transport.url", "must not be empty");
        }
        Ok(())
    }
}
