//! reqwest-backed request adapter
//!
//! Resolves relative URLs against the configured Graph endpoint, injects
//! bearer tokens, stamps telemetry headers and retries transient failures.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::auth::provider::AuthProvider;
use crate::config::settings::ClientConfig;
use crate::error::{GraphError, Result};
use crate::http::adapter::{RawResponse, RequestAdapter};
use crate::http::request::{RequestInformation, RequestOption};
use crate::utils::network::{classify_network_error, create_http_client};
use crate::utils::retry::{parse_retry_after, should_retry_status, RetryOptions};

const SDK_VERSION_HEADER: &str = "SdkVersion";
const CLIENT_REQUEST_ID_HEADER: &str = "client-request-id";
const RETRY_ATTEMPT_HEADER: &str = "Retry-Attempt";

/// Production [`RequestAdapter`] over reqwest
pub struct GraphRequestAdapter {
    http_client: reqwest::Client,
    auth_provider: Arc<dyn AuthProvider>,
    base_url: Url,
    retry_options: RetryOptions,
    telemetry_enabled: bool,
}

impl GraphRequestAdapter {
    pub fn new(auth_provider: Arc<dyn AuthProvider>, config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http_client = create_http_client(&config.network_config())?;
        // Trailing slash so that Url::join appends instead of replacing the version segment
        let base_url = Url::parse(&format!("{}/", config.base_url()))
            .map_err(|e| GraphError::config(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            http_client,
            auth_provider,
            base_url,
            retry_options: config.retry.clone(),
            telemetry_enabled: config.telemetry_enabled,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URLs pass through; relative ones join the base URL.
    pub fn resolve_url(&self, url: &str) -> Result<Url> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(GraphError::invalid_url("request URL cannot be empty"));
        }
        match Url::parse(trimmed) {
            Ok(absolute) => Ok(absolute),
            Err(url::ParseError::RelativeUrlWithoutBase) => self
                .base_url
                .join(trimmed.trim_start_matches('/'))
                .map_err(|e| GraphError::invalid_url(format!("{}: {}", trimmed, e))),
            Err(e) => Err(GraphError::invalid_url(format!("{}: {}", trimmed, e))),
        }
    }

    async fn send_once(
        &self,
        request: &RequestInformation,
        url: &Url,
        attempt: usize,
        client_request_id: &str,
    ) -> Result<RawResponse> {
        let mut builder = self
            .http_client
            .request(request.method.into(), url.clone());

        for (name, values) in request.headers.iter() {
            builder = builder.header(name, values.join(", "));
        }

        if let Some(token) = self.auth_provider.get_authorization_token(url).await? {
            builder = builder.bearer_auth(token);
        }

        if self.telemetry_enabled {
            builder = builder
                .header(
                    SDK_VERSION_HEADER,
                    format!("graph-rust-core/{}", env!("CARGO_PKG_VERSION")),
                )
                .header(CLIENT_REQUEST_ID_HEADER, client_request_id);
        }

        if attempt > 0 {
            builder = builder.header(RETRY_ATTEMPT_HEADER, attempt.to_string());
        }

        for option in &request.options {
            if let RequestOption::Timeout(timeout) = option {
                builder = builder.timeout(*timeout);
            }
        }

        if let Some(content) = &request.content {
            builder = builder.body(content.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| classify_network_error(e, url.as_str()))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_network_error(e, url.as_str()))?
            .to_vec();

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn max_retries(&self, request: &RequestInformation) -> usize {
        request
            .options
            .iter()
            .rev()
            .find_map(|option| match option {
                RequestOption::MaxRetries(retries) => Some(*retries),
                _ => None,
            })
            .unwrap_or(self.retry_options.max_retries)
    }

    fn retry_delay(&self, outcome: &Result<RawResponse>, attempt: usize) -> Option<Duration> {
        match outcome {
            Ok(response) if should_retry_status(response.status) => Some(
                response
                    .header("retry-after")
                    .and_then(|value| parse_retry_after(value, chrono::Utc::now()))
                    .unwrap_or_else(|| self.retry_options.delay_for_attempt(attempt)),
            ),
            Err(error) if error.is_retryable() => {
                Some(self.retry_options.delay_for_attempt(attempt))
            }
            _ => None,
        }
    }
}

#[async_trait]
impl RequestAdapter for GraphRequestAdapter {
    async fn send(&self, request: RequestInformation) -> Result<RawResponse> {
        let url = self.resolve_url(&request.url)?;
        let max_retries = self.max_retries(&request);
        let client_request_id = Uuid::new_v4().to_string();
        let mut attempt = 0;

        loop {
            debug!("{} {} (attempt {})", request.method, url, attempt + 1);
            let outcome = self
                .send_once(&request, &url, attempt, &client_request_id)
                .await;

            if attempt >= max_retries {
                return outcome;
            }

            match self.retry_delay(&outcome, attempt + 1) {
                Some(delay) => {
                    attempt += 1;
                    match &outcome {
                        Ok(response) => warn!(
                            "{} {} returned HTTP {}; retrying in {:?} ({}/{})",
                            request.method, url, response.status, delay, attempt, max_retries
                        ),
                        Err(error) => warn!(
                            "{} {} failed: {}; retrying in {:?} ({}/{})",
                            request.method, url, error, delay, attempt, max_retries
                        ),
                    }
                    tokio::time::sleep(delay).await;
                }
                None => return outcome,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::AnonymousAuthProvider;
    use crate::config::cloud::ApiVersion;

    fn adapter(config: ClientConfig) -> GraphRequestAdapter {
        GraphRequestAdapter::new(Arc::new(AnonymousAuthProvider), &config).unwrap()
    }

    #[test]
    fn test_resolve_url() {
        let adapter = adapter(ClientConfig::default());

        assert_eq!(
            adapter.resolve_url("/me/drive/root/children?$top=2").unwrap().as_str(),
            "https://graph.microsoft.com/v1.0/me/drive/root/children?$top=2"
        );
        assert_eq!(
            adapter.resolve_url("$batch").unwrap().as_str(),
            "https://graph.microsoft.com/v1.0/$batch"
        );
        assert_eq!(
            adapter
                .resolve_url("https://sn3302.up.1drv.com/up/abc")
                .unwrap()
                .as_str(),
            "https://sn3302.up.1drv.com/up/abc"
        );
        assert!(adapter.resolve_url("  ").is_err());
    }

    #[test]
    fn test_resolve_url_beta() {
        let adapter = adapter(ClientConfig {
            api_version: ApiVersion::Beta,
            ..ClientConfig::default()
        });
        assert_eq!(
            adapter.resolve_url("users").unwrap().as_str(),
            "https://graph.microsoft.com/beta/users"
        );
    }

    #[test]
    fn test_request_option_overrides_retries() {
        let adapter = adapter(ClientConfig::default());
        let request = RequestInformation::default().with_options(&[RequestOption::MaxRetries(0)]);
        assert_eq!(adapter.max_retries(&request), 0);
        assert_eq!(adapter.max_retries(&RequestInformation::default()), 3);
    }
}
