use crate::core::github::{self, ClientOptions, DEFAULT_RELEASES_URL};
use crate::core::install_dir;
use crate::error::{ManagerError, Result};
use crate::utils::fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_releases_url() -> String {
    DEFAULT_RELEASES_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    github::REQUEST_TIMEOUT.as_secs()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub install_dir: Option<PathBuf>,
    #[serde(default)]
    pub github_api_token: Option<String>,
    #[serde(default = "default_releases_url")]
    pub releases_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            install_dir: None,
            github_api_token: None,
            releases_url: default_releases_url(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Reads `path`, writing a default config there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;

        if config.releases_url.trim().is_empty() {
            return Err(ManagerError::config_error("releases_url must not be empty"));
        }
        if config.request_timeout_secs == 0 {
            return Err(ManagerError::config_error(
                "request_timeout_secs must be greater than zero",
            ));
        }

        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::ensure_dir_exists(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// `GITHUB_TOKEN` wins over the token stored in the config file.
    pub fn token(&self) -> Option<String> {
        github::token_from_env().or_else(|| {
            self.github_api_token
                .clone()
                .filter(|t| !t.trim().is_empty())
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            releases_url: self.releases_url.clone(),
            token: self.token(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            ..ClientOptions::default()
        }
    }

    /// Explicit override, then the configured directory, then detection.
    pub fn resolve_install_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir.or(self.install_dir.as_deref()) {
            fs::ensure_dir_exists(dir)?;
            return Ok(dir.to_path_buf());
        }
        install_dir::resolve_install_dir()
    }
}

fn get_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".protonge"))
        .ok_or(ManagerError::HomeDirectoryNotFound)
}

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.json"))
}
