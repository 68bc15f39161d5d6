//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the API endpoint and preferred statistics range.
//!
//! Configuration is stored at `~/.config/repcache/config.json`.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::StatsRange;

/// Application name used for config directory paths
const APP_NAME: &str = "repcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// API endpoint used when none is configured
pub const DEFAULT_API_BASE_URL: &str = "https://api.repcache.app/v1";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub default_stats_range: Option<StatsRange>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn api_base_url(&self) -> &str {
        self.api_base_url.as_deref().unwrap_or(DEFAULT_API_BASE_URL)
    }

    pub fn stats_range(&self) -> StatsRange {
        self.default_stats_range.unwrap_or_default()
    }
}
