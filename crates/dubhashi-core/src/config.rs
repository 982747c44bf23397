//! Configuration management for dubhashi.
//!
//! This module provides core configuration that doesn't depend on
//! platform-specific audio or HTTP libraries.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::APP_NAME;

/// Core configuration structure for the application.
///
/// Endpoint and model defaults live with the API clients; the config only
/// stores explicit overrides so a fresh file stays small.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Subscription key for the speech-to-text service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sarvam_key: Option<String>,

    /// Speech-to-text endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_endpoint: Option<String>,

    /// Speech recognition model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speech_model: Option<String>,

    /// Translate-and-speak endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate_endpoint: Option<String>,

    /// Synthesized speech voice identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_model: Option<String>,

    /// Discard recordings under this duration (in seconds)
    #[serde(
        default = "default_discard_duration",
        skip_serializing_if = "is_default_discard_duration"
    )]
    pub discard_duration: f32,

    /// Record successful translations in the local history file
    #[serde(default = "default_true", skip_serializing_if = "is_true")]
    pub save_history: bool,
}

fn default_true() -> bool {
    true
}

fn is_true(v: &bool) -> bool {
    *v
}

fn default_discard_duration() -> f32 {
    0.5
}

fn is_default_discard_duration(v: &f32) -> bool {
    (*v - 0.5).abs() < f32::EPSILON
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sarvam_key: None,
            speech_endpoint: None,
            speech_model: None,
            translate_endpoint: None,
            voice_model: None,
            discard_duration: default_discard_duration(),
            save_history: true,
        }
    }
}

impl Config {
    /// Get the speech service subscription key
    pub fn key_sarvam(&self) -> Option<&str> {
        self.sarvam_key.as_deref()
    }

    /// Get the speech endpoint override
    pub fn speech_endpoint(&self) -> Option<&str> {
        self.speech_endpoint.as_deref()
    }

    /// Get the speech model name
    pub fn speech_model(&self) -> Option<&str> {
        self.speech_model.as_deref()
    }

    /// Get the translate endpoint override
    pub fn translate_endpoint(&self) -> Option<&str> {
        self.translate_endpoint.as_deref()
    }

    /// Get the voice model name
    pub fn voice_model(&self) -> Option<&str> {
        self.voice_model.as_deref()
    }

    /// Get the discard duration as a Duration
    pub fn discard_duration(&self) -> Duration {
        Duration::from_secs_f32(self.discard_duration)
    }
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new ConfigManager with the default configuration directory.
    pub fn new() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Creates a new ConfigManager with a specified configuration directory.
    #[cfg(test)]
    pub fn with_config_dir<P: AsRef<std::path::Path>>(dir: P) -> Self {
        let config_path = dir.as_ref().join(format!("{}.toml", APP_NAME));
        Self { config_path }
    }

    /// Returns the default path to the configuration file.
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to retrieve configuration directory")?;
        Ok(config_dir.join(APP_NAME).join(format!("{}.toml", APP_NAME)))
    }

    /// Loads the configuration from the config file or returns default.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let config_content = fs::read_to_string(&self.config_path)
            .with_context(|| format!("Failed to read config file at {:?}", self.config_path))?;

        let config: Config = toml::from_str(&config_content)
            .with_context(|| format!("Failed to parse config file at {:?}", self.config_path))?;

        if config.key_sarvam().is_none() {
            warn!(
                "Speech service subscription key is not set. Transcription will not work \
                 without it. Edit the config file to set sarvam_key."
            );
        }

        Ok(config)
    }

    /// Saves the configuration to the config file.
    pub fn save(&self, config: &Config) -> Result<()> {
        let config_dir = self
            .config_path
            .parent()
            .with_context(|| format!("Failed to get parent directory of {:?}", self.config_path))?;

        fs::create_dir_all(config_dir)
            .with_context(|| format!("Failed to create config directory at {:?}", config_dir))?;

        let serialized =
            toml::to_string_pretty(&config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, serialized)
            .with_context(|| format!("Failed to write config file at {:?}", self.config_path))?;

        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path(&self) -> &std::path::Path {
        &self.config_path
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.sarvam_key.is_none());
        assert!(config.speech_endpoint.is_none());
        assert!(config.save_history);
        assert_eq!(config.discard_duration, 0.5);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            sarvam_key: Some("test-key".to_string()),
            speech_model: Some("saarika:v1".to_string()),
            voice_model: Some("arvind".to_string()),
            ..Default::default()
        };

        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(config.sarvam_key, deserialized.sarvam_key);
        assert_eq!(config.speech_model, deserialized.speech_model);
        assert_eq!(config.voice_model, deserialized.voice_model);
    }

    #[test]
    fn test_config_manager_save_load() {
        let temp_dir = std::env::temp_dir().join("dubhashi-test");
        fs::create_dir_all(&temp_dir).unwrap();

        let manager = ConfigManager::with_config_dir(&temp_dir);

        let config = Config {
            sarvam_key: Some("test-key".to_string()),
            save_history: false,
            ..Default::default()
        };

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(config.sarvam_key, loaded.sarvam_key);
        assert!(!loaded.save_history);

        // Cleanup
        fs::remove_dir_all(&temp_dir).ok();
    }
}
