//! Authentication provider trait and implementations
//!
//! The request adapter asks a provider for a bearer token per request. A
//! provider answers `None` for hosts it must not authenticate against, which
//! keeps tokens away from pre-authenticated upload URLs and foreign hosts.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::collections::HashSet;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;
use url::Url;

use crate::config::cloud::NationalCloud;
use crate::error::{GraphError, Result};

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_BUFFER: time::Duration = time::Duration::minutes(5);

/// Trait for bearer token providers
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Token for a request to `url`, or `None` when the request must go out
    /// without an `Authorization` header.
    async fn get_authorization_token(&self, url: &Url) -> Result<Option<String>>;
}

/// Hosts a provider is willing to send tokens to.
#[derive(Debug, Clone, Default)]
pub struct AllowedHosts {
    hosts: HashSet<String>,
}

impl AllowedHosts {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            hosts: hosts
                .into_iter()
                .map(|host| host.as_ref().trim().to_ascii_lowercase())
                .filter(|host| !host.is_empty())
                .collect(),
        }
    }

    /// The Graph host of one national cloud.
    pub fn for_cloud(cloud: NationalCloud) -> Self {
        Self::new([cloud.graph_host()])
    }

    /// An empty set allows every host.
    pub fn is_allowed(&self, url: &Url) -> bool {
        if url.scheme() != "https" {
            return false;
        }
        match url.host_str() {
            Some(host) => self.hosts.is_empty() || self.hosts.contains(&host.to_ascii_lowercase()),
            None => false,
        }
    }
}

/// Provider backed by any azure_identity credential
pub struct TokenCredentialAuthProvider {
    credential: Arc<dyn TokenCredential>,
    scopes: Vec<String>,
    allowed_hosts: AllowedHosts,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenCredentialAuthProvider {
    pub fn new(
        credential: Arc<dyn TokenCredential>,
        scopes: Vec<String>,
        allowed_hosts: AllowedHosts,
    ) -> Self {
        Self {
            credential,
            scopes,
            allowed_hosts,
            cached: Mutex::new(None),
        }
    }

    /// DefaultAzureCredential with the cloud's `.default` scope
    pub fn default_credential(cloud: NationalCloud) -> Result<Self> {
        let credential = DefaultAzureCredential::create(TokenCredentialOptions::default())
            .map_err(|e| {
                GraphError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?;

        Ok(Self::new(
            Arc::new(credential),
            vec![cloud.default_scope()],
            AllowedHosts::for_cloud(cloud),
        ))
    }

    /// Client secret credential against the cloud's login authority
    pub fn client_secret(
        cloud: NationalCloud,
        tenant_id: String,
        client_id: String,
        client_secret: String,
    ) -> Result<Self> {
        if tenant_id.trim().is_empty() || client_id.trim().is_empty() {
            return Err(GraphError::config(
                "tenant_id and client_id are required for client secret authentication",
            ));
        }

        let authority_url = Url::parse(&cloud.authority_url())
            .map_err(|e| GraphError::config(format!("Invalid authority URL: {}", e)))?;

        let credential = ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_url,
            tenant_id,
            client_id,
            client_secret,
        );

        Ok(Self::new(
            Arc::new(credential),
            vec![cloud.default_scope()],
            AllowedHosts::for_cloud(cloud),
        ))
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_on - EXPIRY_BUFFER > OffsetDateTime::now_utc() {
                return Ok(token.token.secret().to_string());
            }
        }

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        let token = self
            .credential
            .get_token(&scopes)
            .await
            .map_err(|e| GraphError::authentication(format!("Failed to get token: {}", e)))?;
        debug!("Acquired access token expiring at {}", token.expires_on);

        let secret = token.token.secret().to_string();
        *cached = Some(token);
        Ok(secret)
    }
}

#[async_trait]
impl AuthProvider for TokenCredentialAuthProvider {
    async fn get_authorization_token(&self, url: &Url) -> Result<Option<String>> {
        if !self.allowed_hosts.is_allowed(url) {
            return Ok(None);
        }
        self.access_token().await.map(Some)
    }
}

/// Provider handing out a token acquired elsewhere
pub struct StaticTokenProvider {
    token: String,
    allowed_hosts: AllowedHosts,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>, allowed_hosts: AllowedHosts) -> Self {
        Self {
            token: token.into(),
            allowed_hosts,
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenProvider {
    async fn get_authorization_token(&self, url: &Url) -> Result<Option<String>> {
        if self.token.trim().is_empty() {
            return Err(GraphError::authentication("Access token is empty"));
        }
        if !self.allowed_hosts.is_allowed(url) {
            return Ok(None);
        }
        Ok(Some(self.token.clone()))
    }
}

/// Provider that never authenticates
#[derive(Debug, Default)]
pub struct AnonymousAuthProvider;

#[async_trait]
impl AuthProvider for AnonymousAuthProvider {
    async fn get_authorization_token(&self, _url: &Url) -> Result<Option<String>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_hosts() {
        let hosts = AllowedHosts::for_cloud(NationalCloud::Global);
        let graph = Url::parse("https://graph.microsoft.com/v1.0/me").unwrap();
        let upload = Url::parse("https://sn3302.up.1drv.com/up/fe6987415ace7X4e1eF866337").unwrap();
        let plain = Url::parse("http://graph.microsoft.com/v1.0/me").unwrap();

        assert!(hosts.is_allowed(&graph));
        assert!(!hosts.is_allowed(&upload));
        assert!(!hosts.is_allowed(&plain));
        assert!(AllowedHosts::default().is_allowed(&upload));
    }

    #[tokio::test]
    async fn test_static_provider_skips_foreign_hosts() {
        let provider =
            StaticTokenProvider::new("secret", AllowedHosts::for_cloud(NationalCloud::Global));
        let graph = Url::parse("https://graph.microsoft.com/v1.0/me").unwrap();
        let other = Url::parse("https://example.com/").unwrap();

        assert_eq!(
            provider.get_authorization_token(&graph).await.unwrap(),
            Some("secret".to_string())
        );
        assert_eq!(provider.get_authorization_token(&other).await.unwrap(), None);
    }
}
