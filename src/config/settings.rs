//! Client configuration
//!
//! Configuration is an explicit value handed to the request adapter and the
//! protocol components. It can be built in code, or loaded from a TOML/JSON
//! file with environment overrides on top.

use crate::config::cloud::{ApiVersion, NationalCloud};
use crate::error::{GraphError, Result};
use crate::utils::network::NetworkConfig;
use crate::utils::retry::RetryOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default chunk size for drive item uploads (320 KiB).
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 320 * 1024;

/// Default chunk size for file attachment uploads (5 MiB).
pub const ATTACHMENT_MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub national_cloud: NationalCloud,
    pub api_version: ApiVersion,
    /// Overrides the base URL derived from cloud and version.
    pub base_url: Option<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
    pub retry: RetryOptions,
    pub telemetry_enabled: bool,
    pub upload_chunk_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let network = NetworkConfig::default();
        Self {
            national_cloud: NationalCloud::default(),
            api_version: ApiVersion::default(),
            base_url: None,
            connect_timeout_secs: network.connect_timeout.as_secs(),
            request_timeout_secs: network.request_timeout.as_secs(),
            user_agent: None,
            retry: RetryOptions::default(),
            telemetry_enabled: true,
            upload_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_cloud(national_cloud: NationalCloud) -> Self {
        Self {
            national_cloud,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            let parsed = url::Url::parse(base_url).map_err(|e| {
                GraphError::config(format!("Invalid base URL '{}': {}", base_url, e))
            })?;
            if parsed.cannot_be_a_base() {
                return Err(GraphError::config(format!(
                    "Base URL '{}' cannot be used as a base",
                    base_url
                )));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(GraphError::config("Request timeout must be greater than zero"));
        }

        if self.upload_chunk_size == 0 {
            return Err(GraphError::config("Upload chunk size must be greater than zero"));
        }

        if self.retry.multiplier < 1.0 {
            return Err(GraphError::config("Retry multiplier must be at least 1.0"));
        }

        Ok(())
    }

    /// Base URL all relative request URLs are resolved against.
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://{}/{}",
                self.national_cloud.graph_host(),
                self.api_version
            ),
        }
    }

    pub fn network_config(&self) -> NetworkConfig {
        let defaults = NetworkConfig::default();
        NetworkConfig {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }

    /// Load configuration from a file, then apply environment overrides.
    pub async fn load(path: &Path) -> Result<Self> {
        let mut config = load_from_file(path).await?;
        load_from_env(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, no file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        load_from_env(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }
}

async fn load_from_file(path: &Path) -> Result<ClientConfig> {
    let contents = tokio::fs::read_to_string(path).await?;

    // Try to parse as TOML first, then JSON as fallback
    if let Ok(config) = toml::from_str::<ClientConfig>(&contents) {
        return Ok(config);
    }

    let config = serde_json::from_str::<ClientConfig>(&contents)
        .map_err(|e| GraphError::config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(config)
}

/// Apply `GRAPH_*` overrides. Unparseable values are ignored.
pub fn load_from_env<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("GRAPH_NATIONAL_CLOUD") {
        if let Ok(cloud) = value.parse() {
            config.national_cloud = cloud;
        }
    }

    if let Some(value) = lookup("GRAPH_API_VERSION") {
        if let Ok(version) = value.parse() {
            config.api_version = version;
        }
    }

    if let Some(value) = lookup("GRAPH_BASE_URL") {
        if !value.trim().is_empty() {
            config.base_url = Some(value.trim().to_string());
        }
    }

    if let Some(value) = lookup("GRAPH_MAX_RETRIES") {
        if let Ok(retries) = value.parse::<usize>() {
            config.retry.max_retries = retries;
        }
    }

    if let Some(value) = lookup("GRAPH_TELEMETRY") {
        config.telemetry_enabled = value.to_lowercase() == "true" || value == "1";
    }

    if let Some(value) = lookup("GRAPH_REQUEST_TIMEOUT_SECS") {
        if let Ok(seconds) = value.parse::<u64>() {
            config.request_timeout_secs = seconds;
        }
    }

    if let Some(value) = lookup("GRAPH_UPLOAD_CHUNK_SIZE") {
        if let Ok(size) = value.parse::<u64>() {
            config.upload_chunk_size = size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_base_url() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "https://graph.microsoft.com/v1.0");

        let config = ClientConfig {
            api_version: ApiVersion::Beta,
            ..ClientConfig::for_cloud(NationalCloud::China)
        };
        assert_eq!(
            config.base_url(),
            "https://microsoftgraph.chinacloudapi.cn/beta"
        );
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GRAPH_NATIONAL_CLOUD", "us_gov"),
            ("GRAPH_API_VERSION", "beta"),
            ("GRAPH_MAX_RETRIES", "7"),
            ("GRAPH_TELEMETRY", "false"),
            ("GRAPH_UPLOAD_CHUNK_SIZE", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        load_from_env(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.national_cloud, NationalCloud::UsGov);
        assert_eq!(config.api_version, ApiVersion::Beta);
        assert_eq!(config.retry.max_retries, 7);
        assert!(!config.telemetry_enabled);
        assert_eq!(config.upload_chunk_size, DEFAULT_MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_validate() {
        assert!(ClientConfig::default().validate().is_ok());

        let config = ClientConfig {
            base_url: Some("not a url".to_string()),
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());

        let config = ClientConfig {
            upload_chunk_size: 0,
            ..ClientConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
