//! config - YAML configuration with environment overrides
//!
//! Lookup order for `load_default`:
//! 1. ./buddy.yaml
//! 2. <config dir>/buddy/config.yaml
//! 3. built-in defaults
//!
//! `BUDDY_DATA_DIR` and `BUDDY_MODE` override whatever was loaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::learning::MAX_INTERACTIONS;
use crate::shell::Platform;
use crate::terminal::MAX_COMMAND_HISTORY;

pub const DATA_DIR_ENV: &str = "BUDDY_DATA_DIR";
pub const MODE_ENV: &str = "BUDDY_MODE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Unknown mode '{0}' (expected 'browser' or 'desktop')")]
    UnknownMode(String),
}

/// Whether handlers may touch the host system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Describe actions instead of running them.
    #[default]
    Browser,
    Desktop,
}

impl std::str::FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "browser" => Ok(Mode::Browser),
            "desktop" => Ok(Mode::Desktop),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub data_dir: PathBuf,
    pub mode: Mode,
    /// Defaults to the platform the binary was built for.
    pub platform: Option<Platform>,
    /// `None` lets shell commands run without a deadline.
    pub shell_timeout_ms: Option<u64>,
    pub max_interactions: usize,
    pub max_command_history: usize,
    pub log_level: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            mode: Mode::Browser,
            platform: None,
            shell_timeout_ms: Some(60_000),
            max_interactions: MAX_INTERACTIONS,
            max_command_history: MAX_COMMAND_HISTORY,
            log_level: "warn".to_string(),
        }
    }
}

impl AssistantConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: AssistantConfig = serde_yaml::from_str(&content)?;
        config.apply_env()?;
        Ok(config)
    }

    pub fn load_default() -> Result<Self, ConfigError> {
        let local = PathBuf::from("./buddy.yaml");
        if local.exists() {
            return Self::load(&local);
        }

        if let Some(dir) = dirs::config_dir() {
            let user = dir.join("buddy").join("config.yaml");
            if user.exists() {
                return Self::load(&user);
            }
        }

        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::current)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var(DATA_DIR_ENV).ok().as_deref(),
            std::env::var(MODE_ENV).ok().as_deref(),
        )
    }

    /// Empty values are ignored.
    pub fn apply_overrides(&mut self, data_dir: Option<&str>, mode: Option<&str>) -> Result<(), ConfigError> {
        if let Some(dir) = data_dir.filter(|d| !d.trim().is_empty()) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(mode) = mode.filter(|m| !m.trim().is_empty()) {
            self.mode = mode.parse()?;
        }
        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("buddy"))
        .unwrap_or_else(|| PathBuf::from(".buddy"))
}
