//! Upload session payloads
//!
//! The same session shape comes back from session creation, from each chunk
//! acknowledgement and from a status query. An empty `nextExpectedRanges`
//! means the server holds the whole file.

use super::AdditionalData;
use crate::config::settings::{ATTACHMENT_MAX_CHUNK_SIZE, DEFAULT_MAX_CHUNK_SIZE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_url: Option<String>,
    #[serde(
        default,
        with = "crate::utils::datetime::optional_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_expected_ranges: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_cancelled: Option<bool>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

impl UploadSession {
    pub fn new(upload_url: impl Into<String>, expiration_date_time: DateTime<Utc>) -> Self {
        Self {
            upload_url: Some(upload_url.into()),
            expiration_date_time: Some(expiration_date_time),
            next_expected_ranges: vec!["0-".to_string()],
            ..Self::default()
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_expected_ranges.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled.unwrap_or(false)
    }

    /// Upload URL, if present and non-blank.
    pub fn validated_upload_url(&self) -> Option<&str> {
        self.upload_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// What to do when the target name already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictBehavior {
    Rename,
    Replace,
    Fail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveItemUploadableProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(
        rename = "@microsoft.graph.conflictBehavior",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub conflict_behavior: Option<ConflictBehavior>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentItem {
    pub attachment_type: String,
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_inline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

impl AttachmentItem {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        Self {
            attachment_type: "file".to_string(),
            name: name.into(),
            size,
            content_type: None,
            is_inline: None,
            content_id: None,
            additional_data: AdditionalData::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintDocumentUploadProperties {
    pub document_name: String,
    pub content_type: String,
    pub size: u64,
    #[serde(flatten)]
    pub additional_data: AdditionalData,
}

/// Body of a `createUploadSession` call.
///
/// Each target resource expects its properties under a different key:
/// `item` for drive items, `AttachmentItem` for mail/event attachments and
/// `properties` for print documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UploadSessionRequestBody {
    #[serde(rename = "item")]
    DriveItem(DriveItemUploadableProperties),
    #[serde(rename = "AttachmentItem")]
    Attachment(AttachmentItem),
    #[serde(rename = "properties")]
    PrintDocument(PrintDocumentUploadProperties),
}

impl UploadSessionRequestBody {
    /// Chunk size to use when the caller does not pick one.
    pub fn default_max_chunk_size(&self) -> u64 {
        match self {
            UploadSessionRequestBody::Attachment(_) => ATTACHMENT_MAX_CHUNK_SIZE,
            _ => DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}
