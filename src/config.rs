// Configuration Module

use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::sync::http::parse_base_url;

// Configuration Struct
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Address of the server exposing `/web/metabase/*`.
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub debounce_ms: u64,
    pub request_timeout_secs: u64,
    pub resume_polling_on_start: bool,
    /// Opened by "Explore your data".
    pub reporting_url: String,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

// Default values for config if file doesn't exist
impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8021".to_string(),
            poll_interval_ms: 2000,
            debounce_ms: 500,
            request_timeout_secs: 30,
            resume_polling_on_start: true,
            reporting_url: "https://reporting.avniproject.org".to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        parse_base_url(&self.base_url)?;
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("org", "ReportSync", "reportsync")
        .context("Failed to get project directories")
}

// Function to get the configuration file path
pub fn get_config_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;
    let config_dir = proj_dirs.config_dir();
    fs::create_dir_all(config_dir)?; // Ensure config directory exists
    Ok(config_dir.join("config.toml"))
}

/// Where the interactive screen writes its log when `log_file` is unset.
pub fn default_log_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;
    let data_dir = proj_dirs.data_local_dir();
    fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("reportsync.log"))
}

// Function to load configuration
pub fn load_config(config_path: &Path) -> Result<Config> {
    if config_path.exists() {
        let contents = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        Ok(config)
    } else {
        // Return default config if file doesn't exist
        Ok(Config::default())
    }
}

// Function to save configuration
pub fn save_config(config: &Config, config_path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(config_path, contents)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("test_config.toml");

        let initial_config = Config {
            base_url: "https://staging.example.org".to_string(),
            poll_interval_ms: 1500,
            log_file: Some(PathBuf::from("/tmp/reportsync.log")),
            ..Config::default()
        };

        save_config(&initial_config, &config_path)?;
        assert!(config_path.exists());

        let loaded_config = load_config(&config_path)?;
        assert_eq!(initial_config, loaded_config);

        dir.close()?;
        Ok(())
    }

    #[test]
    fn test_load_default_config_if_not_exists() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("non_existent_config.toml");

        let loaded_config = load_config(&config_path)?;
        assert_eq!(loaded_config, Config::default());
        assert_eq!(loaded_config.poll_interval_ms, 2000);
        assert_eq!(loaded_config.debounce_ms, 500);

        dir.close()?;
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config_path = dir.path().join("partial.toml");
        fs::write(&config_path, "base_url = \"http://10.0.0.5:8021\"\n")?;

        let loaded_config = load_config(&config_path)?;
        assert_eq!(loaded_config.base_url, "http://10.0.0.5:8021");
        assert_eq!(loaded_config.request_timeout_secs, 30);
        assert!(loaded_config.resume_polling_on_start);
        Ok(())
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let config = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
        assert!(Config::default().validate().is_ok());
    }
}
