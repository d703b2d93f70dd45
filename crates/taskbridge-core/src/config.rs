//! Configuration management for taskbridge.
//!
//! Handles loading and saving configuration from TOML files.
//! Config files are stored in platform-specific locations:
//!
//! - **macOS/Linux**: `~/.config/taskbridge/config.toml`
//! - **Windows**: `%APPDATA%\taskbridge\config.toml`
//!
//! Values from the file can be overridden by environment variables
//! (`LINEAR_API_URL`, `LINEAR_TIMEOUT_SECS`). The API key is never stored
//! here; it lives in the OS keychain or `LINEAR_API_KEY`.
//!
//! # Example
//!
//! ```ignore
//! use taskbridge_core::config::Config;
//!
//! let mut config = Config::load()?;
//! config.set("linear.timeout_secs", "10")?;
//! config.save()?;
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{Error, Result};

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config directory name.
const CONFIG_DIR_NAME: &str = "taskbridge";

/// Default Linear GraphQL endpoint.
pub const DEFAULT_LINEAR_API_URL: &str = "https://api.linear.app/graphql";

/// Default upper bound for one HTTP request.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `linear.api_url`.
pub const ENV_LINEAR_API_URL: &str = "LINEAR_API_URL";

/// Environment variable overriding `linear.timeout_secs`.
pub const ENV_LINEAR_TIMEOUT_SECS: &str = "LINEAR_TIMEOUT_SECS";

/// Environment variable holding the Linear API key.
pub const ENV_LINEAR_API_KEY: &str = "LINEAR_API_KEY";

// =============================================================================
// Configuration structures
// =============================================================================

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Linear configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linear: Option<LinearConfig>,
}

/// Linear provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConfig {
    /// GraphQL endpoint
    #[serde(default = "default_linear_url")]
    pub api_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LinearConfig {
    fn default() -> Self {
        Self {
            api_url: default_linear_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl LinearConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_linear_url() -> String {
    DEFAULT_LINEAR_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// =============================================================================
// Config implementation
// =============================================================================

impl Config {
    /// Get the configuration directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(CONFIG_DIR_NAME))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from the default location.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    ///
    /// Returns a default (empty) config if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = ?path, "Config file does not exist, using defaults");
            return Ok(Self::default());
        }

        debug!(path = ?path, "Loading config");

        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;

        info!(path = ?path, "Config loaded successfully");
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        debug!(path = ?path, "Saving config");

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        info!(path = ?path, "Config saved successfully");
        Ok(())
    }

    /// Linear settings with defaults filled in.
    pub fn linear_or_default(&self) -> LinearConfig {
        self.linear.clone().unwrap_or_default()
    }

    /// Apply environment overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup` (an environment-like source).
    ///
    /// Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup(ENV_LINEAR_API_URL) {
            debug!(var = ENV_LINEAR_API_URL, "Overriding linear.api_url from environment");
            self.set("linear.api_url", &url)?;
        }
        if let Some(secs) = lookup(ENV_LINEAR_TIMEOUT_SECS) {
            debug!(var = ENV_LINEAR_TIMEOUT_SECS, "Overriding linear.timeout_secs from environment");
            self.set("linear.timeout_secs", &secs)
                .map_err(|e| Error::Config(format!("{}: {}", ENV_LINEAR_TIMEOUT_SECS, e)))?;
        }
        Ok(())
    }

    /// Set a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `linear.api_url`)
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let (provider, field) = split_key(key)?;

        match provider {
            "linear" => {
                let config = self.linear.get_or_insert_with(LinearConfig::default);
                match field {
                    "api_url" | "url" => config.api_url = value.to_string(),
                    "timeout_secs" | "timeout" => {
                        let secs: u64 = value.trim().parse().map_err(|_| {
                            Error::Config(format!("Invalid timeout '{}': expected seconds", value))
                        })?;
                        if secs == 0 {
                            return Err(Error::Config("Timeout must be at least 1 second".into()));
                        }
                        config.timeout_secs = secs;
                    }
                    _ => {
                        return Err(Error::Config(format!(
                            "Unknown Linear config field: {}",
                            field
                        )))
                    }
                }
            }
            _ => {
                return Err(Error::Config(format!("Unknown provider: {}", provider)));
            }
        }

        Ok(())
    }

    /// Get a configuration value by key path.
    ///
    /// Key format: `provider.field` (e.g., `linear.api_url`)
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let (provider, field) = split_key(key)?;

        match provider {
            "linear" => {
                let Some(config) = &self.linear else {
                    return Ok(None);
                };
                match field {
                    "api_url" | "url" => Ok(Some(config.api_url.clone())),
                    "timeout_secs" | "timeout" => Ok(Some(config.timeout_secs.to_string())),
                    _ => Err(Error::Config(format!(
                        "Unknown Linear config field: {}",
                        field
                    ))),
                }
            }
            _ => Err(Error::Config(format!("Unknown provider: {}", provider))),
        }
    }
}

fn split_key(key: &str) -> Result<(&str, &str)> {
    let parts: Vec<&str> = key.split('.').collect();
    match parts.as_slice() {
        [provider, field] => Ok((*provider, *field)),
        _ => Err(Error::Config(format!(
            "Invalid config key '{}'. Expected format: provider.field",
            key
        ))),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::{NamedTempFile, TempDir};

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.linear.is_none());

        let linear = config.linear_or_default();
        assert_eq!(linear.api_url, "https://api.linear.app/graphql");
        assert_eq!(linear.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();

        config.set("linear.api_url", "https://linear.example.com/graphql").unwrap();
        config.set("linear.timeout", "5").unwrap();

        assert_eq!(
            config.get("linear.api_url").unwrap(),
            Some("https://linear.example.com/graphql".to_string())
        );
        assert_eq!(config.get("linear.timeout_secs").unwrap(), Some("5".to_string()));
    }

    #[test]
    fn test_invalid_key() {
        let mut config = Config::default();

        assert!(config.set("invalid", "value").is_err());
        assert!(config.set("too.many.parts", "value").is_err());
        assert!(config.set("jira.url", "value").is_err());

        // Unconfigured provider reads as None
        assert_eq!(config.get("linear.api_url").unwrap(), None);

        config.set("linear.api_url", "x").unwrap();
        assert!(config.get("linear.unknown_field").is_err());
    }

    #[test]
    fn test_invalid_timeout() {
        let mut config = Config::default();
        assert!(config.set("linear.timeout_secs", "soon").is_err());
        assert!(config.set("linear.timeout_secs", "0").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = Config::default();
        config.linear = Some(LinearConfig {
            api_url: "https://linear.example.com/graphql".to_string(),
            timeout_secs: 12,
        });

        let temp_file = NamedTempFile::new().unwrap();
        let path = temp_file.path().to_path_buf();

        config.save_to(&path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[linear]"));
        assert!(contents.contains("timeout_secs = 12"));

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_nonexistent() {
        let path = PathBuf::from("/nonexistent/path/config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(config.linear.is_none());
    }

    #[test]
    fn test_load_partial_section_uses_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[linear]\ntimeout_secs = 3\n").unwrap();

        let config = Config::load_from(temp_file.path()).unwrap();
        let linear = config.linear.unwrap();
        assert_eq!(linear.api_url, DEFAULT_LINEAR_API_URL);
        assert_eq!(linear.timeout_secs, 3);
    }

    #[test]
    fn test_load_malformed_file() {
        let temp_file = NamedTempFile::new().unwrap();
        std::fs::write(temp_file.path(), "[linear\n").unwrap();

        let err = Config::load_from(temp_file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = Config {
            linear: Some(LinearConfig {
                api_url: "https://from-file.test/graphql".into(),
                timeout_secs: 10,
            }),
        };

        config
            .apply_overrides(env(&[
                ("LINEAR_API_URL", "https://from-env.test/graphql"),
                ("LINEAR_TIMEOUT_SECS", "7"),
            ]))
            .unwrap();

        let linear = config.linear_or_default();
        assert_eq!(linear.api_url, "https://from-env.test/graphql");
        assert_eq!(linear.timeout_secs, 7);
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("LINEAR_API_URL", "  ")])).unwrap();
        assert!(config.linear.is_none());
    }

    #[test]
    fn test_bad_env_timeout_names_variable() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("LINEAR_TIMEOUT_SECS", "abc")]))
            .unwrap_err();
        assert!(err.to_string().contains("LINEAR_TIMEOUT_SECS"));
    }
}
