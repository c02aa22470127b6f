//! Configuration management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};
use crate::tables::DecodeOptions;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Decoding settings
    pub decode: DecodeConfig,
    /// Output settings
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Reject tables whose records would run past the end of the image
    pub strict_bounds: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Hex dump the raw bytes of every header and record
    pub hexdump: bool,
    /// Also list CSTEP clock steps with a zero frequency
    pub show_invalid: bool,
}

impl DecodeConfig {
    pub fn options(&self) -> DecodeOptions {
        DecodeOptions {
            strict_bounds: self.strict_bounds,
        }
    }
}

/// Get the config directory path for the current platform
pub fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // Windows: %APPDATA%\nvpower
        std::env::var("APPDATA")
            .ok()
            .map(|p| PathBuf::from(p).join("nvpower"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        // $XDG_CONFIG_HOME/nvpower, falling back to ~/.config/nvpower
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|p| PathBuf::from(p).join(".config")))
            .map(|p| p.join("nvpower"))
    }
}

/// Get the config file path
pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml_edit::de::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Self {
        let Some(config_path) = config_file() else {
            log::warn!("Could not determine config directory");
            return Config::default();
        };
        if !config_path.exists() {
            return Config::default();
        }
        Self::load_or_default(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    fn load_or_default(path: &Path) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Could not load config file {}: {}", path.display(), e);
                log::warn!("Using default configuration");
                Config::default()
            }
        }
    }

    /// Save configuration to the default location, returning where it went
    pub fn save(&self) -> AppResult<PathBuf> {
        let config_path = config_file()
            .ok_or_else(|| AppError::Config("Could not determine config path".into()))?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(config_dir) = path.parent() {
            fs::create_dir_all(config_dir)?;
        }

        let content = toml_edit::ser::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }
}
