//! Configuration for the voicesig engine
//!
//! Loaded from a TOML file under the user config directory; a default
//! file is written on first use. The embedding backend preference list
//! lives here; the engine itself never probes the environment or the
//! network to pick a backend.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::embedding::EmbedderConfig;
use crate::voice::DEFAULT_CHUNK_SIZE;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Path to the signature database
    pub database_path: PathBuf,
    /// Words per embedded chunk
    pub chunk_size: usize,
    /// Embedding backends in preference order; the first usable one wins
    pub providers: Vec<EmbedderConfig>,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            database_path: data_dir().join("voices.db"),
            chunk_size: DEFAULT_CHUNK_SIZE,
            providers: vec![EmbedderConfig::openrouter(), EmbedderConfig::hash()],
        }
    }
}

impl VoiceConfig {
    /// Load configuration from file, writing defaults on first use
    pub fn load() -> Result<Self> {
        let path = config_path();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: VoiceConfig = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Path of the TOML config file
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicesig")
        .join("config.toml")
}

/// Data directory for the signature database
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voicesig")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VoiceConfig::default();
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.providers.len(), 2);
        assert!(config.database_path.ends_with("voices.db"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = VoiceConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let back: VoiceConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(back.chunk_size, config.chunk_size);
        assert_eq!(back.providers.len(), config.providers.len());
    }
}
