use std::path::{Path, PathBuf};
use anyhow::{Result, Context};

use crate::settings::Settings;

const APP_DIR: &str = "auto-reader";
const STORE_FILE: &str = "settings.json";

/// Default settings location under the user's config directory
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(STORE_FILE))
}

/// Loads settings, falling back to defaults when the file is missing or malformed.
pub fn load_settings(path: Option<&Path>) -> Settings {
    let path = match path.map(Path::to_path_buf).or_else(default_settings_path) {
        Some(p) => p,
        None => {
            tracing::warn!("Cannot find config directory. Using defaults.");
            return Settings::default();
        }
    };

    if !path.exists() {
        tracing::info!("No stored settings found at {}. Using defaults.", path.display());
        return Settings::default();
    }

    let data = match std::fs::read_to_string(&path) {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!("Failed to open settings file {}: {}. Using defaults.", path.display(), e);
            return Settings::default();
        }
    };

    match serde_json::from_str::<Settings>(&data) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Failed to deserialize stored settings: {}. Using defaults.", e);
            Settings::default()
        }
    }
}

pub fn save_settings(settings: &Settings, path: Option<&Path>) -> Result<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(default_settings_path)
        .context("Cannot find config directory")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(settings)
        .context("Failed to serialize settings")?;
    std::fs::write(&path, data)
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;

    tracing::info!("Settings saved to {}", path.display());
    Ok(path)
}
