use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend_url: String,
    pub request_timeout_secs: u64,
    pub capture_quality: u8,
    pub preferred_facing: String, // "environment" or "user"
    pub ideal_width: u32,
    pub ideal_height: u32,
    pub camera_index: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 120,
            capture_quality: 95,
            preferred_facing: "environment".to_string(),
            ideal_width: 1280,
            ideal_height: 720,
            camera_index: 0,
            log_level: "info".to_string(),
        }
    }
}

pub fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("Agro Scan");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let config_str = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        validate_config(&config)?;

        Ok(config)
    } else {
        let default_config = Config::default();
        save_config_internal(&default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config: &Config) -> AppResult<()> {
    validate_config(config)?;
    save_config_internal(config)
}

fn save_config_internal(config: &Config) -> AppResult<()> {
    let config_path = get_config_path()?;

    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(&config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_str)?;

    log::info!("Configuration saved successfully");
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if !config.backend_url.starts_with("http://") && !config.backend_url.starts_with("https://") {
        return Err(AppError::validation(
            "backend_url",
            "Must be an http:// or https:// URL",
        ));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation(
            "request_timeout_secs",
            "Must be greater than 0",
        ));
    }

    if config.capture_quality == 0 || config.capture_quality > 100 {
        return Err(AppError::validation(
            "capture_quality",
            "Must be between 1 and 100",
        ));
    }

    if config.ideal_width == 0 || config.ideal_height == 0 {
        return Err(AppError::validation(
            "ideal_width/ideal_height",
            "Must be greater than 0",
        ));
    }

    let valid_facings = ["environment", "user"];
    if !valid_facings.contains(&config.preferred_facing.as_str()) {
        return Err(AppError::validation(
            "preferred_facing",
            "Must be 'environment' or 'user'",
        ));
    }

    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

// Reset configuration to defaults
pub fn reset_config() -> AppResult<()> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let backup_path = config_path.with_extension("json.reset_backup");
        fs::copy(&config_path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    let default_config = Config::default();
    save_config_internal(&default_config)?;

    log::info!("Configuration reset to defaults");
    Ok(())
}
