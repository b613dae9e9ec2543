use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub ws_server: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    /// The WebSocket endpoint: an explicit value (flag or env) wins over the file.
    pub fn server_url(&self, explicit: Option<String>) -> Option<String> {
        let non_blank = |url: String| {
            let url = url.trim().to_string();
            (!url.is_empty()).then_some(url)
        };
        explicit
            .and_then(non_blank)
            .or_else(|| self.ws_server.clone().and_then(non_blank))
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ws-chat").join("config.json"))
    }
}
