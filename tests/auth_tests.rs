use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{DefaultAzureCredential, TokenCredentialOptions};
use msgraph_core::auth::{
    AllowedHosts, AnonymousAuthProvider, AuthProvider, StaticTokenProvider,
    TokenCredentialAuthProvider,
};
use msgraph_core::{GraphError, NationalCloud};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use time::OffsetDateTime;
use url::Url;

/// Credential that mints a new numbered token on every call.
#[derive(Debug)]
struct CountingCredential {
    calls: AtomicUsize,
    lifetime: time::Duration,
}

impl CountingCredential {
    fn new(lifetime: time::Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            lifetime,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenCredential for CountingCredential {
    async fn get_token(&self, scopes: &[&str]) -> azure_core::Result<AccessToken> {
        assert_eq!(scopes, ["https://graph.microsoft.com/.default"]);
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(AccessToken::new(
            format!("token-{}", call),
            OffsetDateTime::now_utc() + self.lifetime,
        ))
    }

    async fn clear_cache(&self) -> azure_core::Result<()> {
        Ok(())
    }
}

fn graph_url() -> Url {
    Url::parse("https://graph.microsoft.com/v1.0/me").unwrap()
}

fn provider_with(credential: Arc<CountingCredential>) -> TokenCredentialAuthProvider {
    TokenCredentialAuthProvider::new(
        credential,
        vec![NationalCloud::Global.default_scope()],
        AllowedHosts::for_cloud(NationalCloud::Global),
    )
}

#[cfg(test)]
mod auth_provider_tests {
    use super::*;

    #[tokio::test]
    async fn test_default_credential_creation() {
        // DefaultAzureCredential builds without contacting Azure
        let credential = DefaultAzureCredential::create(TokenCredentialOptions::default());
        assert!(credential.is_ok());
        assert!(TokenCredentialAuthProvider::default_credential(NationalCloud::Global).is_ok());
    }

    #[test]
    fn test_client_secret_parameter_validation() {
        let tenant_id = "12345678-1234-1234-1234-123456789012".to_string();
        let client_id = "87654321-4321-4321-4321-210987654321".to_string();

        assert!(TokenCredentialAuthProvider::client_secret(
            NationalCloud::Global,
            tenant_id.clone(),
            client_id.clone(),
            "test-secret".to_string(),
        )
        .is_ok());

        let result = TokenCredentialAuthProvider::client_secret(
            NationalCloud::China,
            "   ".to_string(),
            client_id,
            "test-secret".to_string(),
        );
        assert!(matches!(result, Err(GraphError::ConfigError(_))));
    }
}

#[cfg(test)]
mod token_cache_tests {
    use super::*;

    #[tokio::test]
    async fn test_token_is_cached() {
        let credential = CountingCredential::new(time::Duration::hours(1));
        let provider = provider_with(credential.clone());

        let first = provider.get_authorization_token(&graph_url()).await.unwrap();
        let second = provider.get_authorization_token(&graph_url()).await.unwrap();

        assert_eq!(first.as_deref(), Some("token-1"));
        assert_eq!(second.as_deref(), Some("token-1"));
        assert_eq!(credential.calls(), 1);
    }

    #[tokio::test]
    async fn test_token_near_expiry_is_refreshed() {
        // Inside the five minute refresh window
        let credential = CountingCredential::new(time::Duration::minutes(2));
        let provider = provider_with(credential.clone());

        provider.get_authorization_token(&graph_url()).await.unwrap();
        let second = provider.get_authorization_token(&graph_url()).await.unwrap();

        assert_eq!(second.as_deref(), Some("token-2"));
        assert_eq!(credential.calls(), 2);
    }

    #[tokio::test]
    async fn test_foreign_hosts_get_no_token() {
        let credential = CountingCredential::new(time::Duration::hours(1));
        let provider = provider_with(credential.clone());

        let upload_url =
            Url::parse("https://sn3302.up.1drv.com/up/fe6987415ace7X4e1eF866337").unwrap();
        let china = Url::parse("https://microsoftgraph.chinacloudapi.cn/v1.0/me").unwrap();

        assert_eq!(provider.get_authorization_token(&upload_url).await.unwrap(), None);
        assert_eq!(provider.get_authorization_token(&china).await.unwrap(), None);
        assert_eq!(credential.calls(), 0);
    }

    #[test]
    fn test_access_token_expiry() {
        let now = OffsetDateTime::now_utc();
        let expired = AccessToken::new("expired-token".to_string(), now - time::Duration::hours(1));
        let valid = AccessToken::new("valid-token".to_string(), now + time::Duration::hours(1));

        assert!(expired.expires_on < now);
        assert!(valid.expires_on > now);
        assert_eq!(valid.token.secret(), "valid-token");
    }
}

#[cfg(test)]
mod static_provider_tests {
    use super::*;

    #[test]
    fn test_empty_static_token_is_rejected() {
        let provider = StaticTokenProvider::new("  ", AllowedHosts::default());
        let result = tokio_test::block_on(provider.get_authorization_token(&graph_url()));
        assert!(matches!(result, Err(GraphError::AuthenticationError(_))));
    }

    #[test]
    fn test_custom_allowed_hosts() {
        let hosts = AllowedHosts::new(["Graph.Microsoft.com", " ", "graph.microsoft.us"]);
        assert!(hosts.is_allowed(&graph_url()));
        assert!(hosts.is_allowed(&Url::parse("https://graph.microsoft.us/v1.0/me").unwrap()));
        assert!(!hosts.is_allowed(&Url::parse("https://dod-graph.microsoft.us/v1.0/me").unwrap()));
    }

    #[tokio::test]
    async fn test_anonymous_provider() {
        let provider = AnonymousAuthProvider;
        assert_eq!(provider.get_authorization_token(&graph_url()).await.unwrap(), None);
    }
}
