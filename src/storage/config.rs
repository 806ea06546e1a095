//! JSON Configuration Management
//!
//! Handles reading and writing the analyzer settings file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::models::settings::AnalyzerSettings;
use crate::utils::error::{AppError, AppResult};
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing analyzer settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AnalyzerSettings,
}

impl ConfigService {
    /// Load `~/.autokaker/config.json`, creating it with defaults when missing
    pub fn new() -> AppResult<Self> {
        Self::open(config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults when missing
    pub fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent() {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            let default_config = AnalyzerSettings::default();
            Self::save_to_file(&config_path, &default_config)?;
            info!("Created default settings at {}", config_path.display());
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> AppResult<AnalyzerSettings> {
        let content = fs::read_to_string(path)?;
        let config: AnalyzerSettings = serde_json::from_str(&content)?;
        config.validate().map_err(AppError::validation)?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AnalyzerSettings) -> AppResult<()> {
        config.validate().map_err(AppError::validation)?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AnalyzerSettings {
        &self.config
    }

    /// Get a clone of the current configuration
    pub fn get_config_clone(&self) -> AnalyzerSettings {
        self.config.clone()
    }

    /// Replace the configuration and persist it
    pub fn update_config(&mut self, config: AnalyzerSettings) -> AppResult<AnalyzerSettings> {
        Self::save_to_file(&self.config_path, &config)?;
        self.config = config;
        Ok(self.config.clone())
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AppResult<()> {
        Self::save_to_file(&self.config_path, &self.config)
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AppResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AppResult<()> {
        self.config = AnalyzerSettings::default();
        self.save()
    }
}
