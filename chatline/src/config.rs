//! Configuration loading.
//!
//! Sources, later ones winning: built-in defaults, `~/.chatline/config.toml`,
//! `CHATLINE_*` environment variables, command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Per-user directory for configuration and data.
const APP_DIR: &str = ".chatline";
const CONFIG_FILE: &str = "config.toml";

pub const ENV_BACKEND_URL: &str = "CHATLINE_BACKEND_URL";
pub const ENV_DATA_DIR: &str = "CHATLINE_DATA_DIR";
pub const ENV_API_KEY: &str = "CHATLINE_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not find home directory")]
    NoHome,

    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Client and relay settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Chat endpoint the client posts `{message}` to.
    pub backend_url: String,
    /// Network timeout for backend calls, in seconds. None waits indefinitely.
    pub request_timeout_secs: Option<u64>,
    /// Where the session file lives. Defaults to `~/.chatline`.
    pub data_dir: Option<PathBuf>,
    pub relay: RelayConfig,
}

/// Settings for `chatline serve`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub port: u16,
    /// OpenAI-compatible chat completions endpoint.
    pub upstream_url: String,
    /// Bearer token for the upstream endpoint.
    pub api_key: Option<String>,
    pub model: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:3000/api/chat".to_string(),
            request_timeout_secs: None,
            data_dir: None,
            relay: RelayConfig::default(),
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_url: "https://api.longcat.chat/openai/v1/chat/completions".to_string(),
            api_key: None,
            model: "LongCat-Flash-Chat".to_string(),
            system_prompt: "You are a helpful and intelligent assistant. \
                            Provide clear, accurate, and helpful responses."
                .to_string(),
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = app_dir()?.join(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(dir) = var(ENV_DATA_DIR).filter(|v| !v.is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(key) = var(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.relay.api_key = Some(key);
        }
    }

    /// Directory holding the session file.
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => app_dir(),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn app_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(ConfigError::NoHome)
}
