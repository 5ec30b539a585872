//! Batch response payload and per-request results

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{ApiError, GraphError, Result};
use crate::http::adapter::ErrorMappings;

/// Outcome of one request in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponseItem {
    pub id: String,
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atomicity_group: Option<String>,
}

impl BatchResponseItem {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn is_json(&self) -> bool {
        self.header("content-type")
            .map(|content_type| content_type.to_ascii_lowercase().contains("json"))
            .unwrap_or(false)
    }

    /// Raw body bytes; base64 bodies of non-JSON responses are decoded.
    pub fn body_bytes(&self) -> Result<Option<Vec<u8>>> {
        match &self.body {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(encoded)) if !self.is_json() => {
                Ok(Some(STANDARD.decode(encoded)?))
            }
            Some(value) => Ok(Some(serde_json::to_vec(value)?)),
        }
    }

    /// Typed error for a failed sub-response, `None` when it succeeded.
    pub fn api_error(&self, mappings: Option<&ErrorMappings>) -> Result<Option<ApiError>> {
        if self.is_success() {
            return Ok(None);
        }
        let body = self.body_bytes()?.unwrap_or_default();
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        let text = String::from_utf8_lossy(&body).into_owned();
        let mut error = ApiError::new(self.status, headers, text);
        error.model = mappings
            .and_then(|mappings| mappings.resolve(self.status))
            .and_then(|factory| factory(&body));
        Ok(Some(error))
    }

    /// Deserialize the body into `T`.
    ///
    /// Needs a `Content-Type` header to tell embedded JSON from base64.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        if self.header("content-type").is_none() {
            return Err(GraphError::invalid_argument(format!(
                "response '{}' has no content-type header",
                self.id
            )));
        }
        match &self.body {
            None | Some(Value::Null) => Ok(None),
            Some(value) if self.is_json() => Ok(Some(serde_json::from_value(value.clone())?)),
            Some(_) => match self.body_bytes()? {
                Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
                None => Ok(None),
            },
        }
    }
}

/// Response of one `$batch` call.
///
/// Sub-responses with error statuses are ordinary entries here; only the
/// outer call failing is an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResponseContent {
    #[serde(default)]
    pub responses: Vec<BatchResponseItem>,
    /// Not followed; kept for callers that page batch responses themselves.
    #[serde(rename = "@nextLink", default, skip_serializing_if = "Option::is_none")]
    pub next_link: Option<String>,
    #[serde(skip)]
    pub status_code: Option<u16>,
    #[serde(skip)]
    pub headers: HashMap<String, String>,
}

impl BatchResponseContent {
    pub fn get_response(&self, id: &str) -> Result<&BatchResponseItem> {
        self.responses
            .iter()
            .find(|response| response.id == id)
            .ok_or_else(|| {
                GraphError::invalid_argument(format!("No response found for id: {}", id))
            })
    }

    pub fn get_response_body<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        self.get_response(id)?.body_as()
    }

    pub fn status_codes(&self) -> HashMap<String, u16> {
        self.responses
            .iter()
            .map(|response| (response.id.clone(), response.status))
            .collect()
    }

    pub fn next_link(&self) -> Option<&str> {
        self.next_link.as_deref()
    }
}
