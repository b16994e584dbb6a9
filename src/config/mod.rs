//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::calculate::{
    PracticePolicy, Smoothing, DEFAULT_POINTS_SCALE, DEFAULT_SMOOTHING_K,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Combo scoring constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    /// Matches added to the denominator of the weighted win rate
    #[serde(default = "default_smoothing_k")]
    pub smoothing_k: f64,

    /// Points per match that count as full scoring efficiency
    #[serde(default = "default_points_scale")]
    pub points_scale: f64,
}

fn default_smoothing_k() -> f64 {
    DEFAULT_SMOOTHING_K
}

fn default_points_scale() -> f64 {
    DEFAULT_POINTS_SCALE
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            smoothing_k: default_smoothing_k(),
            points_scale: default_points_scale(),
        }
    }
}

impl RankingConfig {
    pub fn smoothing(&self) -> Result<Smoothing, ConfigError> {
        Smoothing::new(self.smoothing_k, self.points_scale)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Input selection defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub practice: PracticePolicy,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub ranking: RankingConfig,

    #[serde(default)]
    pub selection: SelectionConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            ranking: RankingConfig::default(),
            selection: SelectionConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranking.smoothing()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.ranking.smoothing_k, 10.0);
        assert_eq!(config.ranking.points_scale, 3.0);
        assert_eq!(config.selection.practice, PracticePolicy::Exclude);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_points_scale() {
        let mut config = AppConfig::default();
        config.ranking.points_scale = 0.0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_validation_negative_k() {
        let mut config = AppConfig::default();
        config.ranking.smoothing_k = -5.0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            [ranking]
            points_scale = 4.0

            [selection]
            practice = "include"
            "#,
        )
        .unwrap();

        assert_eq!(config.ranking.smoothing_k, 10.0);
        assert_eq!(config.ranking.points_scale, 4.0);
        assert_eq!(config.selection.practice, PracticePolicy::Include);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.selection.practice, parsed.selection.practice);
    }
}
