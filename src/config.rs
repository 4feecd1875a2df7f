use std::path::Path;

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Runtime-tunable renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Global ambient light colour (RGBA).
    pub ambient: [f32; 4],
    /// Near objects whose closest point lies beyond this distance are culled.
    pub cull_distance: f32,
    /// Lower bound for the shared near plane.
    pub min_near_plane: f32,
    pub near_margin: f32,
    pub far_margin: f32,
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            ambient: [0.05, 0.05, 0.05, 1.0],
            cull_distance: 1.0e7,
            min_near_plane: 0.01,
            near_margin: 0.9,
            far_margin: 1.1,
            clear_color: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

impl RenderConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig =
            toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn ambient(&self) -> Vec4 {
        Vec4::from_array(self.ambient)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_near_plane > 0.0) {
            return Err(ConfigError::Invalid("min_near_plane must be positive"));
        }
        if !(self.cull_distance > 0.0) {
            return Err(ConfigError::Invalid("cull_distance must be positive"));
        }
        if !(self.near_margin > 0.0 && self.near_margin <= 1.0) {
            return Err(ConfigError::Invalid("near_margin must be in (0, 1]"));
        }
        if self.far_margin < 1.0 {
            return Err(ConfigError::Invalid("far_margin must be at least 1"));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = RenderConfig::from_toml_str("cull_distance = 500.0").unwrap();
        assert_eq!(config.cull_distance, 500.0);
        assert_eq!(config.near_margin, RenderConfig::default().near_margin);
    }

    #[test]
    fn rejects_non_positive_near_floor() {
        let err = RenderConfig::from_toml_str("min_near_plane = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn reports_parse_errors() {
        let err = RenderConfig::from_toml_str("ambient = \"bright\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
