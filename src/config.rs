//! Configuration file parsing
//!
//! An optional TOML file with these sections, every field defaulted:
//! - [server] - Bind address, public base URL, upload limit
//! - [storage] - Data directory for the JSON store
//! - [ai] - Model endpoint, model name and API key
//!
//! `TOOLBENCH_*` environment variables override the file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::converter::MAX_FILE_SIZE;

/// Looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "toolbench.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: {value}")]
    InvalidEnv { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub storage: StorageSection,

    #[serde(default)]
    pub ai: AiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    /// Address the HTTP server listens on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Public URL used in the sitemap
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Largest accepted upload in bytes
    #[serde(default = "default_max_upload")]
    pub max_upload_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_url: default_base_url(),
            max_upload_bytes: default_max_upload(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_max_upload() -> usize {
    MAX_FILE_SIZE
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("database")
}

impl StorageSection {
    /// The JSON store inside the data directory
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("storage.json")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            endpoint: default_endpoint(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl Config {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `path`, or `toolbench.toml` if it exists, then apply the
    /// environment. An explicit path that cannot be read is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("loaded configuration from {}", path.display());
        Self::from_toml(&text, path)
    }

    /// Override fields from `TOOLBENCH_*` variables found through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(bind) = lookup("TOOLBENCH_BIND") {
            self.server.bind = bind;
        }
        if let Some(base_url) = lookup("TOOLBENCH_BASE_URL") {
            self.server.base_url = base_url;
        }
        if let Some(value) = lookup("TOOLBENCH_MAX_UPLOAD_BYTES") {
            self.server.max_upload_bytes = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                name: "TOOLBENCH_MAX_UPLOAD_BYTES",
                value,
            })?;
        }
        if let Some(dir) = lookup("TOOLBENCH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = lookup("TOOLBENCH_AI_API_KEY") {
            self.ai.api_key = Some(key);
        }
        if let Some(model) = lookup("TOOLBENCH_AI_MODEL") {
            self.ai.model = model;
        }
        if let Some(endpoint) = lookup("TOOLBENCH_AI_ENDPOINT") {
            self.ai.endpoint = endpoint;
        }
        Ok(())
    }
}
