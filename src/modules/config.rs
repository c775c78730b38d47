use std::fs;
use std::path::Path;

use super::storage::get_data_dir;
use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

const CONFIG_FILE: &str = "relay_config.json";

/// Load application config
pub fn load_app_config() -> AppResult<AppConfig> {
    let data_dir = get_data_dir().map_err(AppError::Config)?;
    load_config_from(&data_dir.join(CONFIG_FILE))
}

/// Save application config
pub fn save_app_config(config: &AppConfig) -> AppResult<()> {
    let data_dir = get_data_dir().map_err(AppError::Config)?;
    save_config_to(&data_dir.join(CONFIG_FILE), config)
}

pub fn load_config_from(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::new());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config file: {}", e)))
}

pub fn save_config_to(path: &Path, config: &AppConfig) -> AppResult<()> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content)?;
    Ok(())
}
