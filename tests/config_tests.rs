//! Configuration loading tests
//!
//! Tests for reading ClientConfig from TOML and JSON files and applying
//! environment overrides.

use msgraph_core::config::settings::load_from_env;
use msgraph_core::{ApiVersion, ClientConfig, NationalCloud};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

fn write_config(contents: &str, suffix: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[cfg(test)]
mod file_loading_tests {
    use super::*;

    #[tokio::test]
    async fn test_load_toml() {
        let file = write_config(
            r#"
national_cloud = "us_gov"
api_version = "beta"
request_timeout_secs = 45
telemetry_enabled = false

[retry]
max_retries = 5
initial_interval = 250
"#,
            ".toml",
        );

        let config = ClientConfig::load(file.path()).await.unwrap();
        assert_eq!(config.national_cloud, NationalCloud::UsGov);
        assert_eq!(config.api_version, ApiVersion::Beta);
        assert_eq!(config.request_timeout_secs, 45);
        assert!(!config.telemetry_enabled);
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.initial_interval, Duration::from_millis(250));
        // Unset fields keep their defaults
        assert_eq!(config.retry.multiplier, 2.0);
        assert_eq!(config.base_url(), "https://graph.microsoft.us/beta");
    }

    #[tokio::test]
    async fn test_load_json_fallback() {
        let file = write_config(
            r#"{"base_url": "https://graph.example.test/v1.0/", "upload_chunk_size": 655360}"#,
            ".json",
        );

        let config = ClientConfig::load(file.path()).await.unwrap();
        assert_eq!(config.base_url(), "https://graph.example.test/v1.0");
        assert_eq!(config.upload_chunk_size, 655_360);
    }

    #[tokio::test]
    async fn test_invalid_file_is_a_config_error() {
        let file = write_config("this is neither toml nor json", ".conf");
        let err = ClientConfig::load(file.path()).await.unwrap_err();
        assert!(matches!(err, msgraph_core::GraphError::ConfigError(_)));
    }

    #[tokio::test]
    async fn test_invalid_values_fail_validation() {
        let file = write_config("request_timeout_secs = 0\n", ".toml");
        assert!(ClientConfig::load(file.path()).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ClientConfig::load(&dir.path().join("missing.toml")).await;
        assert!(matches!(result, Err(msgraph_core::GraphError::IoError(_))));
    }
}

#[cfg(test)]
mod environment_tests {
    use super::*;

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("GRAPH_NATIONAL_CLOUD", "china"),
            ("GRAPH_MAX_RETRIES", "0"),
            ("GRAPH_TELEMETRY", "false"),
            ("GRAPH_UPLOAD_CHUNK_SIZE", "not-a-number"),
        ]);

        let mut config = ClientConfig::default();
        load_from_env(&mut config, |key| env.get(key).map(|value| value.to_string()));

        assert_eq!(config.national_cloud, NationalCloud::China);
        assert_eq!(config.retry.max_retries, 0);
        assert!(!config.telemetry_enabled);
        // Unparseable values are ignored
        assert_eq!(config.upload_chunk_size, 320 * 1024);
        assert_eq!(config.base_url(), "https://microsoftgraph.chinacloudapi.cn/v1.0");
    }
}
