use super::AdditionalData;
use crate::error::{GraphError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of a Graph collection: `{"value": [...], "@odata.nextLink"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub value: Vec<T>,
    #[serde(
        rename = "@odata.nextLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_link: Option<String>,
    #[serde(
        rename = "@odata.deltaLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub delta_link: Option<String>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

impl<T> PageResult<T> {
    pub fn new(value: Vec<T>, next_link: Option<String>) -> Self {
        Self {
            value,
            next_link,
            delta_link: None,
            additional_data: AdditionalData::new(),
        }
    }

    /// Next link, treating a blank string as absent.
    pub fn validated_next_link(&self) -> Option<&str> {
        self.next_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }
}

impl<T: DeserializeOwned> PageResult<T> {
    /// Convert a raw collection response into a page.
    ///
    /// The payload must carry a `value` array, and a present next link must be
    /// an absolute URL.
    pub fn from_json(response: Value) -> Result<Self> {
        match response.get("value") {
            Some(Value::Array(_)) => {}
            Some(_) => {
                return Err(GraphError::invalid_page(
                    "the response 'value' property is not a collection",
                ))
            }
            None => {
                return Err(GraphError::invalid_page(
                    "the response does not contain a 'value' collection",
                ))
            }
        }

        let page: PageResult<T> = serde_json::from_value(response)?;
        if let Some(link) = page.validated_next_link() {
            url::Url::parse(link).map_err(|e| {
                GraphError::invalid_url(format!("next link '{}' is not a valid URL: {}", link, e))
            })?;
        }
        Ok(page)
    }

    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        Self::from_json(value)
    }
}
