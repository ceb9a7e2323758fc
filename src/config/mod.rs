//! Configuration module for devtron-client.
//!
//! This module provides all configuration types and loading functionality.
//! Configuration can be loaded from YAML files; the orchestrator root URL
//! can also come from the `ORCHESTRATOR_ROOT` environment variable.

mod api;
mod logging;

pub use api::{ApiConfig, DEFAULT_ROOT_URL, ROOT_URL_ENV};
pub use logging::{LogFormat, LogLevel, LogOutput, LoggingConfig};

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DevtronError;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API connection configuration.
    pub api: ApiConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads configuration from an optional path.
    /// If path is None, uses default search paths.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, DevtronError> {
        let mut config = match path {
            Some(p) => Self::read_from_path(p)?,
            None => {
                let default_paths = [
                    "/etc/devtron-client/config.yaml",
                    "/etc/devtron-client/config.yml",
                    "devtron-client.yaml",
                    "devtron-client.yml",
                ];

                match default_paths.iter().find(|p| Path::new(p).exists()) {
                    Some(p) => Self::read_from_path(p)?,
                    None => Self::default(),
                }
            }
        };

        config.apply_env(std::env::var(ROOT_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DevtronError> {
        let config = Self::read_from_path(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self, DevtronError> {
        let config = Self::parse(content)?;
        config.validate()?;
        Ok(config)
    }

    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self, DevtronError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            DevtronError::config(format!(
                "Failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self, DevtronError> {
        serde_yaml::from_str(content)
            .map_err(|e| DevtronError::config(format!("Failed to parse config: {}", e)))
    }

    /// Overrides the root URL with the value of `ORCHESTRATOR_ROOT`, if set.
    pub fn apply_env(&mut self, root_url: Option<String>) {
        if let Some(root) = root_url.filter(|r| !r.trim().is_empty()) {
            self.api.root_url = root;
        }
    }

    /// Validates configuration.
    pub fn validate(&self) -> Result<(), DevtronError> {
        let root = self.api.root_url.trim();
        if root.is_empty() {
            return Err(DevtronError::config("api.root_url must not be empty"));
        }

        if let Err(e) = reqwest::Url::parse(root) {
            return Err(DevtronError::config_with_source(
                format!("api.root_url '{}' is not a valid URL", root),
                e,
            ));
        }

        if self.api.timeout_ms == 0 {
            return Err(DevtronError::config("api.timeout_ms must be > 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.api.root_url, DEFAULT_ROOT_URL);
        assert_eq!(config.api.timeout_ms, 60_000);
        assert!(config.api.token.is_none());
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_yaml() {
        let yaml = r#"
api:
  root_url: "https://devtron.example.com/orchestrator"
  timeout_ms: 15000
  token: "secret"

logging:
  level: debug
  format: json
  output: stdout
"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let config = Config::load_from_path(file.path()).unwrap();

        assert_eq!(config.api.root_url, "https://devtron.example.com/orchestrator");
        assert_eq!(config.api.timeout_ms, 15_000);
        assert_eq!(config.api.token, Some("secret".to_string()));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.output, LogOutput::Stdout);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::load_from_str("api:\n  timeout_ms: 500\n").unwrap();

        assert_eq!(config.api.root_url, DEFAULT_ROOT_URL);
        assert_eq!(config.api.timeout_ms, 500);
    }

    #[test]
    fn test_validation_timeout_zero() {
        let result = Config::load_from_str("api:\n  timeout_ms: 0\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timeout_ms"));
    }

    #[test]
    fn test_validation_empty_root() {
        let result = Config::load_from_str("api:\n  root_url: \"  \"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("root_url"));
    }

    #[test]
    fn test_validation_relative_root() {
        let result = Config::load_from_str("api:\n  root_url: \"/orchestrator\"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not a valid URL"));
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load_from_path("/nonexistent/devtron-client.yaml");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read"));
    }

    #[test]
    fn test_apply_env_overrides_root() {
        let mut config = Config::default();

        config.apply_env(Some("http://10.0.0.5:32000/orchestrator".to_string()));
        assert_eq!(config.api.root_url, "http://10.0.0.5:32000/orchestrator");

        config.apply_env(Some(String::new()));
        assert_eq!(config.api.root_url, "http://10.0.0.5:32000/orchestrator");

        config.apply_env(None);
        assert_eq!(config.api.root_url, "http://10.0.0.5:32000/orchestrator");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();

        assert!(yaml.contains("root_url:"));
        assert!(yaml.contains("timeout_ms:"));
        assert!(yaml.contains("level:"));
    }
}
