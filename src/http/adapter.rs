//! Request adapter seam
//!
//! Every protocol component talks to the network through [`RequestAdapter`].
//! Implementations only move bytes; status checking, error model resolution
//! and deserialization live in the checked helpers below so that test
//! doubles stay trivial.

use crate::error::{ApiError, GraphError, Result};
use crate::http::request::RequestInformation;
use crate::models::ODataError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Raw HTTP response handed back by an adapter.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub status: u16,
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_json(self, value: &serde_json::Value) -> Self {
        self.with_header("content-type", "application/json")
            .with_body(value.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Build the API error for a failed response, resolving a typed model
    /// through `mappings` when one matches.
    pub fn into_api_error(self, mappings: Option<&ErrorMappings>) -> ApiError {
        let model = mappings
            .and_then(|mappings| mappings.resolve(self.status))
            .and_then(|factory| factory(&self.body));
        let body = String::from_utf8_lossy(&self.body).into_owned();
        ApiError {
            status: self.status,
            headers: self.headers,
            body,
            model,
        }
    }
}

/// Sends a request and returns the raw response.
///
/// Non-2xx statuses are returned as responses, not errors; only transport
/// failures are errors at this level.
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    async fn send(&self, request: RequestInformation) -> Result<RawResponse>;
}

pub type ErrorFactory =
    Arc<dyn Fn(&[u8]) -> Option<Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// Status-code keyed error model registry.
///
/// Keys are an exact code (`"404"`), a class (`"4XX"`, `"5XX"`) or the
/// catch-all `"XXX"`; lookup tries them in that order.
#[derive(Clone, Default)]
pub struct ErrorMappings {
    entries: HashMap<String, ErrorFactory>,
}

impl ErrorMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mappings with [`ODataError`] registered as the catch-all.
    pub fn odata() -> Self {
        let mut mappings = Self::new();
        mappings.insert::<ODataError>("XXX");
        mappings
    }

    /// Register a model deserialized from the error body for `key`.
    pub fn insert<E>(&mut self, key: impl AsRef<str>)
    where
        E: DeserializeOwned + std::error::Error + Send + Sync + 'static,
    {
        let factory: ErrorFactory = Arc::new(|body: &[u8]| {
            serde_json::from_slice::<E>(body)
                .ok()
                .map(|model| Box::new(model) as Box<dyn std::error::Error + Send + Sync>)
        });
        self.insert_factory(key, factory);
    }

    pub fn insert_factory(&mut self, key: impl AsRef<str>, factory: ErrorFactory) {
        self.entries.insert(key.as_ref().to_ascii_uppercase(), factory);
    }

    /// Merge `other` into this set; `other` wins on conflicts.
    pub fn merge(&mut self, other: &ErrorMappings) {
        for (key, factory) in &other.entries {
            self.entries.insert(key.clone(), factory.clone());
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_ascii_uppercase())
    }

    pub fn resolve(&self, status: u16) -> Option<&ErrorFactory> {
        let exact = status.to_string();
        let class = format!("{}XX", status / 100);
        self.entries
            .get(&exact)
            .or_else(|| self.entries.get(&class))
            .or_else(|| self.entries.get("XXX"))
    }
}

impl fmt::Debug for ErrorMappings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("ErrorMappings").field("keys", &keys).finish()
    }
}

impl dyn RequestAdapter + '_ {
    /// Send and turn any non-2xx status into [`GraphError::Api`].
    pub async fn send_checked(
        &self,
        request: RequestInformation,
        mappings: Option<&ErrorMappings>,
    ) -> Result<RawResponse> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            debug!("{} {} failed with HTTP {}", method, url, response.status);
            Err(GraphError::from(response.into_api_error(mappings)))
        }
    }

    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestInformation,
        mappings: Option<&ErrorMappings>,
    ) -> Result<T> {
        self.send_checked(request, mappings).await?.json()
    }

    pub async fn send_no_content(
        &self,
        request: RequestInformation,
        mappings: Option<&ErrorMappings>,
    ) -> Result<()> {
        self.send_checked(request, mappings).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, serde::Deserialize, thiserror::Error)]
    #[error("throttled: {reason}")]
    struct Throttled {
        reason: String,
    }

    #[test]
    fn test_resolve_prefers_exact_then_class() {
        let mut mappings = ErrorMappings::odata();
        mappings.insert::<Throttled>("429");
        mappings.insert::<Throttled>("5xx");

        assert!(mappings.contains_key("5XX"));
        let body = br#"{"reason":"slow down"}"#;
        let model = mappings.resolve(429).and_then(|f| f(body)).unwrap();
        assert_eq!(model.to_string(), "throttled: slow down");

        let model = mappings.resolve(503).and_then(|f| f(body));
        assert!(model.is_some());

        // 404 falls through to the OData catch-all, which cannot parse this body
        assert!(mappings.resolve(404).and_then(|f| f(body)).is_none());
    }

    #[test]
    fn test_into_api_error_with_odata_model() {
        let response = RawResponse::new(404).with_json(&json!({
            "error": {"code": "itemNotFound", "message": "The resource could not be found."}
        }));
        let error = response.into_api_error(Some(&ErrorMappings::odata()));

        assert_eq!(error.status, 404);
        let odata = error.model::<ODataError>().expect("odata model");
        assert_eq!(odata.error.code, "itemNotFound");
        assert_eq!(error.header("Content-Type"), Some("application/json"));
    }
}
