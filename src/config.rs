/// Configuration management
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    pub playback: PlaybackConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable logging
    pub logging_enabled: bool,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

/// Playback session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Period of the position poll against the audio output, in milliseconds
    pub poll_interval_ms: u64,
    /// How far into a track "previous" restarts it instead of moving back
    pub previous_restart_threshold_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig {
                logging_enabled: true,
                log_level: "info".to_string(),
            },
            playback: PlaybackConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            previous_restart_threshold_secs: 3.0,
        }
    }
}

/// Runtime view of [`PlaybackConfig`] handed to the playback manager
#[derive(Debug, Clone, Copy)]
pub struct PlayerSettings {
    pub poll_interval: Duration,
    pub previous_restart_threshold_secs: f64,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for PlayerSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            previous_restart_threshold_secs: config.previous_restart_threshold_secs.max(0.0),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir()?;
        Self::load_from(config_dir.join("config.toml"))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_dir = Self::config_dir()?;
        self.save_to(config_dir.join("config.toml"))
    }

    /// Get configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("Unable to determine config directory")?
            .join("melodeck");
        Ok(dir)
    }

    /// Typed playback settings for the playback manager
    pub fn player_settings(&self) -> PlayerSettings {
        PlayerSettings::from(&self.playback)
    }

    fn load_from(config_path: PathBuf) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Ok(toml::from_str(&content)?)
        } else {
            // Create default config
            let config = Self::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    fn save_to(&self, config_path: PathBuf) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write {}", config_path.display()))?;
        Ok(())
    }
}

/// Load configuration from an explicit path, used when the caller manages
/// its own directories (tests, embedded hosts)
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config> {
    Config::load_from(path.as_ref().to_path_buf())
}
