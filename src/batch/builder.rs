//! Submits batch payloads to the `$batch` endpoint

use std::sync::Arc;
use tracing::{debug, info};

use super::request::BatchRequestContent;
use super::response::BatchResponseContent;
use crate::error::{GraphError, Result};
use crate::http::adapter::{ErrorMappings, RequestAdapter};
use crate::http::request::{HttpMethod, RequestHeaders, RequestInformation, RequestOption};

const BATCH_ENDPOINT: &str = "/$batch";

/// Per-call customization of a batch submission.
#[derive(Debug, Clone, Default)]
pub struct BatchRequestConfiguration {
    pub headers: RequestHeaders,
    pub options: Vec<RequestOption>,
    /// Merged over the default OData mapping for the outer call.
    pub error_mappings: Option<ErrorMappings>,
}

pub struct BatchRequestBuilder {
    adapter: Arc<dyn RequestAdapter>,
    url: String,
}

impl BatchRequestBuilder {
    pub fn new(adapter: Arc<dyn RequestAdapter>) -> Self {
        Self {
            adapter,
            url: BATCH_ENDPOINT.to_string(),
        }
    }

    /// Target another batch endpoint, e.g. an absolute beta URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn to_request_information(
        &self,
        content: &BatchRequestContent,
        config: Option<&BatchRequestConfiguration>,
    ) -> Result<RequestInformation> {
        if content.is_empty() {
            return Err(GraphError::invalid_argument("batch contains no requests"));
        }

        let mut request = RequestInformation::new(HttpMethod::Post, self.url.clone());
        request.set_json_content(content)?;
        request.headers.insert("Accept", "application/json");
        if let Some(config) = config {
            request.headers.extend(&config.headers);
            request.options.extend_from_slice(&config.options);
        }
        Ok(request)
    }

    /// Send the batch and split the response per request.
    ///
    /// Fails only when the outer call fails; failed sub-requests show up as
    /// entries with error statuses.
    pub async fn post_async(
        &self,
        content: &BatchRequestContent,
        config: Option<BatchRequestConfiguration>,
    ) -> Result<BatchResponseContent> {
        let request = self.to_request_information(content, config.as_ref())?;

        let mut mappings = ErrorMappings::odata();
        if let Some(custom) = config.as_ref().and_then(|config| config.error_mappings.as_ref()) {
            mappings.merge(custom);
        }

        info!("Submitting batch of {} requests", content.len());
        let response = self.adapter.send_checked(request, Some(&mappings)).await?;

        let mut batch: BatchResponseContent = response.json()?;
        batch.status_code = Some(response.status);
        batch.headers = response.headers;
        debug!(
            "Batch returned {} responses for {} requests",
            batch.responses.len(),
            content.len()
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::request::BatchRequestItem;
    use crate::http::adapter::RawResponse;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoNetwork;

    #[async_trait]
    impl RequestAdapter for NoNetwork {
        async fn send(&self, request: RequestInformation) -> Result<RawResponse> {
            panic!("unexpected request to {}", request.url);
        }
    }

    #[test]
    fn test_request_information_carries_configuration() {
        let item = BatchRequestItem::new(HttpMethod::Get, "/me").unwrap();
        let content = BatchRequestContent::with_requests([item]).unwrap();
        let mut headers = RequestHeaders::new();
        headers.insert("ConsistencyLevel", "eventual");
        let config = BatchRequestConfiguration {
            headers,
            options: vec![RequestOption::Timeout(Duration::from_secs(5))],
            ..Default::default()
        };

        let builder = BatchRequestBuilder::new(Arc::new(NoNetwork))
            .with_url("https://graph.microsoft.com/beta/$batch");
        let request = builder.to_request_information(&content, Some(&config)).unwrap();

        assert_eq!(request.url, "https://graph.microsoft.com/beta/$batch");
        assert_eq!(request.headers.get_joined("accept").as_deref(), Some("application/json"));
        assert_eq!(request.headers.get_joined("consistencylevel").as_deref(), Some("eventual"));
        assert_eq!(request.options, vec![RequestOption::Timeout(Duration::from_secs(5))]);
    }
}
