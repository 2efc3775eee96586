//! Application configuration management.
//!
//! Persisted settings live at `~/.config/stockdeck/config.json`: the backend
//! base URL, the market-data API key, the last login email, and the
//! first-run flag that gates the welcome countdown. Environment variables
//! (`STOCKDECK_BACKEND_URL`, `STOCKDECK_MARKET_API_KEY`) override file
//! values, and a `.env` file is honored via dotenvy in main.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "stockdeck";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default backend base URL when neither env nor config provides one
const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub backend_url: Option<String>,
    pub market_api_key: Option<String>,
    pub last_email: Option<String>,
    /// Set after the first visit; suppresses the welcome countdown.
    #[serde(default)]
    pub has_visited: bool,
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

    /// Backend base URL: env var wins, then config file, then default.
    pub fn backend_url(&self) -> String {
        std::env::var("STOCKDECK_BACKEND_URL")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.backend_url.clone())
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
    }

    /// Market-data API key: env var wins, then config file.
    pub fn market_api_key(&self) -> Option<String> {
        std::env::var("STOCKDECK_MARKET_API_KEY")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| self.market_api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_url_falls_back_to_default() {
        let config = Config::default();
        // Only meaningful when the env var is unset in the test environment.
        if std::env::var("STOCKDECK_BACKEND_URL").is_err() {
            assert_eq!(config.backend_url(), DEFAULT_BACKEND_URL);
        }
    }

    #[test]
    fn test_backend_url_prefers_config_value() {
        let config = Config {
            backend_url: Some("https://hub.example.com".to_string()),
            ..Default::default()
        };
        if std::env::var("STOCKDECK_BACKEND_URL").is_err() {
            assert_eq!(config.backend_url(), "https://hub.example.com");
        }
    }

    #[test]
    fn test_has_visited_defaults_false_in_old_configs() {
        let config: Config =
            serde_json::from_str(r#"{"backend_url":null,"market_api_key":null,"last_email":"a@x.com"}"#)
                .expect("parse config without has_visited");
        assert!(!config.has_visited);
        assert_eq!(config.last_email.as_deref(), Some("a@x.com"));
    }
}
