use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// Main error type for msgraph-core operations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Graph API error: {0}")]
    Api(Box<ApiError>),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("The upload session is expired; create a new session to continue")]
    SessionExpired,

    #[error("The upload session does not contain an expiration date time")]
    MissingExpiration,

    #[error("The upload session URL must not be empty")]
    MissingUploadUrl,

    #[error("No more bytes expected by the upload session")]
    NoRangesRemaining,

    #[error("Invalid byte range: {0}")]
    InvalidRange(String),

    #[error("Maximum number of requests in a batch is {limit}")]
    BatchCapacityExceeded { limit: usize },

    #[error("A request with id '{id}' already exists in the batch")]
    DuplicateRequestId { id: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid page: {0}")]
    InvalidPage(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl GraphError {
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn invalid_range<S: Into<String>>(msg: S) -> Self {
        Self::InvalidRange(msg.into())
    }

    pub fn invalid_url<S: Into<String>>(msg: S) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn invalid_page<S: Into<String>>(msg: S) -> Self {
        Self::InvalidPage(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Status code of the failed call, for API errors only.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(err) => Some(err.status),
            _ => None,
        }
    }

    /// Whether the transport layer may retry the call that produced this error.
    ///
    /// Only transient conditions qualify: timeouts, throttling and gateway
    /// unavailability. Protocol-level errors are never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionTimeout(_) => true,
            Self::Api(err) => matches!(err.status, 429 | 503 | 504),
            Self::HttpError(err) => err.is_timeout() || err.is_connect(),
            Self::NetworkError(msg) => {
                let msg_lower = msg.to_lowercase();
                msg_lower.contains("timeout") || msg_lower.contains("temporary")
            }
            _ => false,
        }
    }
}

impl From<ApiError> for GraphError {
    fn from(error: ApiError) -> Self {
        Self::Api(Box::new(error))
    }
}

/// Non-2xx response surfaced by the request adapter.
///
/// `model` holds the typed error resolved from the caller's error mappings,
/// when one matched the status code and the body parsed.
#[derive(Debug)]
pub struct ApiError {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub model: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ApiError {
    pub fn new(status: u16, headers: HashMap<String, String>, body: String) -> Self {
        Self {
            status,
            headers,
            body,
            model: None,
        }
    }

    /// Downcast the mapped error model to a concrete type.
    pub fn model<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.model.as_deref().and_then(|model| model.downcast_ref::<E>())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "HTTP {}: {}", self.status, model),
            None if self.body.is_empty() => write!(f, "HTTP {}", self.status),
            None => write!(f, "HTTP {}: {}", self.status, self.body),
        }
    }
}

/// Result type alias for msgraph-core operations
pub type Result<T> = std::result::Result<T, GraphError>;

/// Convert Azure Core errors raised during token acquisition
impl From<azure_core::Error> for GraphError {
    fn from(error: azure_core::Error) -> Self {
        Self::AuthenticationError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_prefers_model() {
        let mut err = ApiError::new(404, HashMap::new(), "raw body".to_string());
        assert_eq!(err.to_string(), "HTTP 404: raw body");

        err.model = Some(Box::new(GraphError::invalid_argument("not here")));
        assert_eq!(err.to_string(), "HTTP 404: Invalid argument: not here");
        assert!(err.model::<GraphError>().is_some());
    }

    #[test]
    fn test_is_retryable() {
        let throttled: GraphError = ApiError::new(429, HashMap::new(), String::new()).into();
        assert!(throttled.is_retryable());
        assert_eq!(throttled.status(), Some(429));

        let not_found: GraphError = ApiError::new(404, HashMap::new(), String::new()).into();
        assert!(!not_found.is_retryable());

        assert!(GraphError::connection_timeout("timed out").is_retryable());
        assert!(!GraphError::SessionExpired.is_retryable());
        assert!(!GraphError::BatchCapacityExceeded { limit: 20 }.is_retryable());
    }
}
