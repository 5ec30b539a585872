//! HTTP client construction and transport error classification

use crate::error::{GraphError, Result};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(100),
            user_agent: format!("msgraph-core-rust/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| GraphError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport failure onto the crate error taxonomy
pub fn classify_network_error(error: reqwest::Error, url: &str) -> GraphError {
    let host = extract_host_from_url(url);

    if error.is_timeout() {
        return GraphError::connection_timeout(format!(
            "Request to '{}' timed out: {}",
            host, error
        ));
    }

    if error.is_connect() {
        if is_dns_resolution_error(&error) {
            return GraphError::network(format!("Unable to resolve host '{}': {}", host, error));
        }
        return GraphError::network(format!("Failed to connect to '{}': {}", host, error));
    }

    if error.is_builder() || error.is_request() {
        return GraphError::invalid_url(format!("Invalid request to '{}': {}", url, error));
    }

    GraphError::HttpError(error)
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "name or service not known",
        "nodename nor servname provided",
        "no such host",
        "failed to lookup address",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

fn extract_host_from_url(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown-host".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host_from_url() {
        let url = "https://graph.microsoft.com/v1.0/me/drive";
        assert_eq!(extract_host_from_url(url), "graph.microsoft.com");
        assert_eq!(extract_host_from_url("/me/drive"), "unknown-host");
    }

    #[test]
    fn test_default_user_agent() {
        let config = NetworkConfig::default();
        assert!(config.user_agent.starts_with("msgraph-core-rust/"));
        assert!(create_http_client(&config).is_ok());
    }
}
