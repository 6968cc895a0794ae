use anyhow::{Context as _, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CANCEL_CHECK_INTERVAL: usize = 1024;

/// Tunables for pipeline execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// How many records Sort, GroupBy, Filter and AddColumn process between cancellation
    /// checks (default: 1024, min: 1)
    #[serde(default = "default_cancel_check_interval")]
    pub cancel_check_interval: usize,

    /// Whether each completed stage emits a debug event with its timing
    #[serde(default = "default_true")]
    pub log_stage_timings: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cancel_check_interval: default_cancel_check_interval(),
            log_stage_timings: default_true(),
        }
    }
}

impl PipelineConfig {
    /// Parse a config from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse pipeline config")?;
        Ok(config.normalised())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline config")
    }

    /// Clamp values into their supported ranges.
    pub fn normalised(mut self) -> Self {
        self.cancel_check_interval = self.cancel_check_interval.max(1);
        self
    }
}

/// Load a config file from an optional location. A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!("No config at {}, using defaults", path.display());
        return Ok(PipelineConfig::default());
    }
    load_config_file(path)
}

/// Load a config file the caller asked for by name. The file must exist.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<PipelineConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    PipelineConfig::from_json(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn save_config(config: &PipelineConfig, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, config.to_json()?)
        .with_context(|| format!("Failed to write config file: {}", path.display()))
}

fn default_cancel_check_interval() -> usize {
    DEFAULT_CANCEL_CHECK_INTERVAL
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.cancel_check_interval, 1024);
        assert!(config.log_stage_timings);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let config = PipelineConfig::from_json(r#"{"cancel_check_interval": 0}"#).unwrap();
        assert_eq!(config.cancel_check_interval, 1);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_named_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_config_file(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_save_and_load() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested").join("config.json");
        let config = PipelineConfig {
            cancel_check_interval: 64,
            log_stage_timings: false,
        };

        save_config(&config, &path)?;
        assert_eq!(load_config(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(load_config(&path).is_err());
    }
}
