use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::db::{DEFAULT_ACCOUNT, DEFAULT_BUDGET};
use crate::duplicates::DuplicateConfig;
use crate::error::{ExtratoError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_budget")]
    pub default_budget: String,
    #[serde(default = "default_account")]
    pub default_account: String,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
}

fn default_budget() -> String {
    DEFAULT_BUDGET.to_string()
}

fn default_account() -> String {
    DEFAULT_ACCOUNT.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            default_budget: default_budget(),
            default_account: default_account(),
            duplicates: DuplicateConfig::default(),
        }
    }
}

impl Settings {
    pub fn duplicate_config(&self) -> DuplicateConfig {
        self.duplicates
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand_path(&self.data_dir)).join("extrato.db")
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("extrato")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("extrato")
}

/// Settings from `~/.config/extrato/settings.json`, or defaults when the
/// file is missing or unreadable.
pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&settings_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ExtratoError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
