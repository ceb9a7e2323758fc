//! API connection configuration types.

use serde::{Deserialize, Serialize};

/// Environment variable holding the orchestrator root URL.
pub const ROOT_URL_ENV: &str = "ORCHESTRATOR_ROOT";

/// Root URL used when neither the config file nor the environment sets one.
pub const DEFAULT_ROOT_URL: &str = "http://localhost:8080/orchestrator";

/// API connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Root URL every relative API path is joined under.
    pub root_url: String,

    /// Default request timeout in milliseconds.
    pub timeout_ms: u64,

    /// Session token sent as the orchestrator's auth cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            root_url: DEFAULT_ROOT_URL.to_string(),
            timeout_ms: 60_000,
            token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_default() {
        let config = ApiConfig::default();
        assert_eq!(config.root_url, "http://localhost:8080/orchestrator");
        assert_eq!(config.timeout_ms, 60_000);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_token_not_serialized_when_absent() {
        let yaml = serde_yaml::to_string(&ApiConfig::default()).unwrap();
        assert!(yaml.contains("root_url:"));
        assert!(!yaml.contains("token"));
    }
}
