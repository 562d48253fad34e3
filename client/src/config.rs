//! Configuration management for the client.

use std::env;
use std::path::PathBuf;

/// File inside the data directory holding every persisted preference.
pub const PREFS_FILE_NAME: &str = "rover_prefs.json";

const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Client configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the stats server, without a trailing slash
    pub api_url: String,
    /// Directory holding the preferences file
    pub data_dir: PathBuf,
}

impl Config {
    pub fn new(api_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            data_dir: data_dir.into(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_url = env::var("ROVER_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::InvalidApiUrl(api_url));
        }

        let data_dir = match env::var_os("ROVER_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|dir| dir.join("rover"))
                .ok_or(ConfigError::MissingDataDir)?,
        };

        Ok(Self::new(api_url, data_dir))
    }

    /// Full path of the preferences file.
    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join(PREFS_FILE_NAME)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ROVER_API_URL must start with http:// or https://, got {0}")]
    InvalidApiUrl(String),

    #[error("No data directory on this platform; set ROVER_DATA_DIR")]
    MissingDataDir,
}
