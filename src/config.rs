//! Configuration for Concierge

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory for the chat database and config file (default: ~/.concierge)
    pub data_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Chat model settings
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Model deployment invoked for user queries
    #[serde(default = "default_deployment_name")]
    pub deployment_name: String,

    /// Maximum number of messages returned in a state envelope
    #[serde(default = "default_max_recent_messages")]
    pub max_recent_messages: usize,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            data_path: home.join(".concierge"),
            http_port: default_http_port(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            deployment_name: default_deployment_name(),
            max_recent_messages: default_max_recent_messages(),
        }
    }
}

impl Config {
    /// Load config from file or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Load config from a specific data directory
    pub fn load_from(data_path: PathBuf) -> Result<Self> {
        let config_path = data_path.join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.data_path = data_path;
            Ok(config)
        } else {
            let mut config = Config::default();
            config.data_path = data_path;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_path)?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(self.data_path.join("config.toml"), content)?;

        Ok(())
    }

    /// Get the default config path
    fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not find home directory".into()))?;
        Ok(home.join(".concierge").join("config.toml"))
    }

    /// Path to SQLite chat database
    pub fn db_path(&self) -> PathBuf {
        self.data_path.join("chat.db")
    }
}

// Default value functions

fn default_http_port() -> u16 {
    4040
}

/// Deployment name, honoring the CHAT_MODEL_DEPLOYMENT_NAME environment variable
fn default_deployment_name() -> String {
    std::env::var("CHAT_MODEL_DEPLOYMENT_NAME").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_max_recent_messages() -> usize {
    50
}
