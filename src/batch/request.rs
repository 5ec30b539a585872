//! Batch request items and the aggregate `$batch` payload

use base64::{engine::general_purpose::STANDARD, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::http::request::{HttpMethod, RequestHeaders, RequestInformation};

/// Most requests the service accepts in one batch.
pub const MAX_REQUESTS: usize = 20;

static VERSION_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(v1\.0|beta)(/|$)").expect("Invalid version segment regex"));

/// Turn an absolute or relative request URL into the batch form: relative to
/// the versioned endpoint, query and fragment kept.
pub fn relative_batch_url(url: &str) -> Result<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(GraphError::invalid_url("batch request URL cannot be empty"));
    }

    let (path, suffix) = match Url::parse(trimmed) {
        Ok(absolute) => {
            let mut suffix = String::new();
            if let Some(query) = absolute.query() {
                suffix.push('?');
                suffix.push_str(query);
            }
            if let Some(fragment) = absolute.fragment() {
                suffix.push('#');
                suffix.push_str(fragment);
            }
            (absolute.path().to_string(), suffix)
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let split = trimmed.find(['?', '#']).unwrap_or(trimmed.len());
            let (path, suffix) = trimmed.split_at(split);
            let path = if path.starts_with('/') {
                path.to_string()
            } else {
                format!("/{}", path)
            };
            (path, suffix.to_string())
        }
        Err(e) => return Err(GraphError::invalid_url(format!("{}: {}", trimmed, e))),
    };

    let path = VERSION_SEGMENT.replace(&path, "/");
    Ok(format!("{}{}", path, suffix))
}

/// One request inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequestItem {
    pub id: String,
    pub method: HttpMethod,
    /// Relative to the versioned endpoint, e.g. `/users?$top=2`.
    pub url: String,
    pub headers: RequestHeaders,
    pub body: Option<Vec<u8>>,
    pub depends_on: Vec<String>,
    pub atomicity_group: Option<String>,
}

impl BatchRequestItem {
    /// A bodyless request with a generated id.
    pub fn new(method: HttpMethod, url: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            method,
            url: relative_batch_url(url)?,
            headers: RequestHeaders::new(),
            body: None,
            depends_on: Vec::new(),
            atomicity_group: None,
        })
    }

    pub fn from_request_information(request: RequestInformation) -> Result<Self> {
        let mut item = Self::new(request.method, &request.url)?;
        item.headers = request.headers;
        item.body = request.content;
        Ok(item)
    }

    /// Convert a prepared reqwest request. Streaming bodies cannot be
    /// embedded and are rejected.
    pub fn from_http_request(request: &reqwest::Request) -> Result<Self> {
        let method: HttpMethod = request.method().as_str().parse()?;
        let mut item = Self::new(method, request.url().as_str())?;

        for (name, value) in request.headers() {
            let value = value.to_str().map_err(|_| {
                GraphError::invalid_argument(format!("header '{}' is not valid text", name))
            })?;
            item.headers.add(name.as_str(), value);
        }

        if let Some(body) = request.body() {
            let bytes = body.as_bytes().ok_or_else(|| {
                GraphError::invalid_argument("streaming request bodies cannot be batched")
            })?;
            item.body = Some(bytes.to_vec());
        }
        Ok(item)
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        self.body = Some(serde_json::to_vec(body)?);
        self.headers.insert("Content-Type", "application/json");
        Ok(self)
    }

    pub fn with_atomicity_group(mut self, group: impl Into<String>) -> Self {
        self.atomicity_group = Some(group.into());
        self
    }

    /// Run this request only after `items` have succeeded.
    pub fn depends_on(&mut self, items: &[&BatchRequestItem]) {
        for item in items {
            if !self.depends_on.contains(&item.id) {
                self.depends_on.push(item.id.clone());
            }
        }
    }

    /// Body as it goes on the wire: JSON objects and arrays embedded, anything
    /// else base64 encoded.
    fn wire_body(&self) -> Option<(Value, bool)> {
        let body = self.body.as_ref()?;
        match serde_json::from_slice::<Value>(body) {
            Ok(value) if value.is_object() || value.is_array() => Some((value, true)),
            _ => Some((Value::String(STANDARD.encode(body)), false)),
        }
    }
}

struct WireHeaders<'a>(&'a RequestHeaders, Option<&'static str>);

impl Serialize for WireHeaders<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut headers = self.0.to_joined_map();
        if let Some(content_type) = self.1 {
            headers
                .entry("content-type".to_string())
                .or_insert_with(|| content_type.to_string());
        }
        let mut map = serializer.serialize_map(Some(headers.len()))?;
        for (name, value) in &headers {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for BatchRequestItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let body = self.wire_body();
        // The service rejects bodies without a content type
        let default_content_type = body.as_ref().map(|(_, is_json)| {
            if *is_json {
                "application/json"
            } else {
                "application/octet-stream"
            }
        });

        let mut state = serializer.serialize_struct("BatchRequestItem", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("method", self.method.as_str())?;
        state.serialize_field("url", &self.url)?;
        if !self.headers.is_empty() || default_content_type.is_some() {
            state.serialize_field("headers", &WireHeaders(&self.headers, default_content_type))?;
        }
        if let Some((value, _)) = &body {
            state.serialize_field("body", value)?;
        }
        if !self.depends_on.is_empty() {
            state.serialize_field("dependsOn", &self.depends_on)?;
        }
        if let Some(group) = &self.atomicity_group {
            state.serialize_field("atomicityGroup", group)?;
        }
        state.end()
    }
}

/// The requests of one `$batch` call, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchRequestContent {
    requests: Vec<BatchRequestItem>,
}

impl BatchRequestContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_requests(items: impl IntoIterator<Item = BatchRequestItem>) -> Result<Self> {
        let mut content = Self::new();
        for item in items {
            content.add_request(item)?;
        }
        Ok(content)
    }

    pub fn requests(&self) -> &[BatchRequestItem] {
        &self.requests
    }

    pub fn get_request(&self, id: &str) -> Option<&BatchRequestItem> {
        self.requests.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Add an item and return its id.
    pub fn add_request(&mut self, item: BatchRequestItem) -> Result<String> {
        if self.requests.len() >= MAX_REQUESTS {
            return Err(GraphError::BatchCapacityExceeded {
                limit: MAX_REQUESTS,
            });
        }
        if self.get_request(&item.id).is_some() {
            return Err(GraphError::DuplicateRequestId { id: item.id });
        }
        let id = item.id.clone();
        self.requests.push(item);
        Ok(id)
    }

    pub fn add_request_information(&mut self, request: RequestInformation) -> Result<String> {
        self.add_request(BatchRequestItem::from_request_information(request)?)
    }

    pub fn add_http_request(&mut self, request: &reqwest::Request) -> Result<String> {
        self.add_request(BatchRequestItem::from_http_request(request)?)
    }

    /// Remove a request and drop it from other requests' dependencies.
    pub fn remove_request(&mut self, id: &str) -> Option<BatchRequestItem> {
        let index = self.requests.iter().position(|item| item.id == id)?;
        let removed = self.requests.remove(index);
        for item in &mut self.requests {
            item.depends_on.retain(|dependency| dependency != id);
        }
        Some(removed)
    }
}

impl Serialize for BatchRequestContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BatchRequestContent", 1)?;
        state.serialize_field("requests", &self.requests)?;
        state.end()
    }
}
