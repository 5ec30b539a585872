//! Resumable chunked upload over a Graph upload session
//!
//! Chunks go out strictly one at a time: the range for chunk N+1 comes from
//! the server's answer to chunk N, so there is never more than one PUT in
//! flight for a task.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, SeekFrom};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::range::ByteRange;
use crate::config::settings::{ClientConfig, DEFAULT_MAX_CHUNK_SIZE};
use crate::error::{GraphError, Result};
use crate::http::adapter::{ErrorMappings, RawResponse, RequestAdapter};
use crate::http::request::{HttpMethod, RequestInformation};
use crate::models::UploadSession;
use crate::utils::datetime::is_expired;

/// Graph wants chunk sizes in multiples of this.
const CHUNK_SIZE_MULTIPLE: u64 = 320 * 1024;

/// Outcome of a finished upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadResult {
    /// Final session state; `next_expected_ranges` is empty.
    pub upload_session: UploadSession,
    /// Body of the completing response (the created drive item or attachment).
    pub item_response: Option<Value>,
    /// `Location` header of the completing response, when sent.
    pub location: Option<String>,
}

impl UploadResult {
    pub fn item<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        self.item_response
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(GraphError::from)
    }
}

pub struct LargeFileUploadTask<R> {
    adapter: Arc<dyn RequestAdapter>,
    upload_session: UploadSession,
    stream: R,
    file_size: u64,
    max_chunk_size: u64,
    next_range: Option<ByteRange>,
    uploaded_chunks: usize,
    uploaded_bytes: u64,
    item_response: Option<Value>,
    location: Option<String>,
    cancellation: CancellationToken,
    error_mappings: ErrorMappings,
}

impl<R> LargeFileUploadTask<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send,
{
    /// Wrap a session and the stream to upload.
    ///
    /// The file size is read from the stream. `max_chunk_size` defaults to
    /// 320 KiB; pass `UploadSessionRequestBody::default_max_chunk_size()` to
    /// get the 5 MiB attachment default, or use [`with_config`](Self::with_config).
    pub async fn new(
        upload_session: UploadSession,
        adapter: Arc<dyn RequestAdapter>,
        mut stream: R,
        max_chunk_size: Option<u64>,
    ) -> Result<Self> {
        let file_size = stream.seek(SeekFrom::End(0)).await?;
        stream.seek(SeekFrom::Start(0)).await?;
        if file_size == 0 {
            return Err(GraphError::invalid_argument("cannot upload an empty stream"));
        }

        let max_chunk_size = max_chunk_size.unwrap_or(DEFAULT_MAX_CHUNK_SIZE);
        if max_chunk_size == 0 {
            return Err(GraphError::invalid_argument(
                "max chunk size must be greater than zero",
            ));
        }
        if max_chunk_size % CHUNK_SIZE_MULTIPLE != 0 {
            warn!(
                "Chunk size {} is not a multiple of 320 KiB; the service may reject some chunks",
                max_chunk_size
            );
        }

        let next_range = upload_session
            .next_expected_ranges
            .first()
            .map(|range| range.parse::<ByteRange>())
            .transpose()?;

        Ok(Self {
            adapter,
            upload_session,
            stream,
            file_size,
            max_chunk_size,
            uploaded_bytes: next_range.map(|range| range.start).unwrap_or(0),
            next_range,
            uploaded_chunks: 0,
            item_response: None,
            location: None,
            cancellation: CancellationToken::new(),
            error_mappings: ErrorMappings::odata(),
        })
    }

    /// Like [`new`](Self::new), with the chunk size taken from
    /// `config.upload_chunk_size`.
    pub async fn with_config(
        upload_session: UploadSession,
        adapter: Arc<dyn RequestAdapter>,
        stream: R,
        config: &ClientConfig,
    ) -> Result<Self> {
        Self::new(upload_session, adapter, stream, Some(config.upload_chunk_size)).await
    }

    pub fn upload_session(&self) -> &UploadSession {
        &self.upload_session
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn max_chunk_size(&self) -> u64 {
        self.max_chunk_size
    }

    pub fn uploaded_chunks(&self) -> usize {
        self.uploaded_chunks
    }

    /// Start offset of the range the server expects next, or the file size
    /// once the upload has completed.
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    pub fn next_range(&self) -> Option<ByteRange> {
        self.next_range
    }

    /// Token another task can use to stop the upload before its next chunk.
    ///
    /// A chunk already on the wire is not interrupted.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Whether `session` (or the task's own session) is past its deadline.
    pub fn upload_session_expired(&self, session: Option<&UploadSession>) -> Result<bool> {
        let session = session.unwrap_or(&self.upload_session);
        let expiration = session
            .expiration_date_time
            .ok_or(GraphError::MissingExpiration)?;
        Ok(is_expired(expiration))
    }

    pub async fn upload(&mut self) -> Result<UploadResult> {
        self.upload_with(|_task: &Self| {}).await
    }

    /// Upload the remaining ranges, calling `on_chunk_complete` after every
    /// acknowledged chunk.
    pub async fn upload_with<F>(&mut self, on_chunk_complete: F) -> Result<UploadResult>
    where
        F: FnMut(&Self) + Send,
    {
        self.ensure_uploadable()?;
        info!(
            "Starting upload of {} bytes in chunks of up to {} bytes",
            self.file_size, self.max_chunk_size
        );
        self.run_pipeline(on_chunk_complete).await
    }

    /// Continue an interrupted upload from the first range the session still
    /// expects. Pass a fresh session (for example from
    /// [`refresh_session_status`](Self::refresh_session_status)) to replace
    /// the task's own.
    pub async fn resume(&mut self, session: Option<UploadSession>) -> Result<UploadResult> {
        self.resume_with(session, |_task: &Self| {}).await
    }

    pub async fn resume_with<F>(
        &mut self,
        session: Option<UploadSession>,
        on_chunk_complete: F,
    ) -> Result<UploadResult>
    where
        F: FnMut(&Self) + Send,
    {
        if let Some(session) = session {
            self.replace_session(session)?;
        }
        self.ensure_uploadable()?;

        let first = self
            .upload_session
            .next_expected_ranges
            .first()
            .ok_or(GraphError::NoRangesRemaining)?
            .parse::<ByteRange>()?;
        self.next_range = Some(first);
        self.uploaded_bytes = first.start;

        info!("Resuming upload at byte range {}", first);
        self.run_pipeline(on_chunk_complete).await
    }

    /// Send one chunk for `range` and fold the response into the session.
    pub async fn next_chunk(&mut self, range: ByteRange) -> Result<UploadSession> {
        let upload_url = self
            .upload_session
            .validated_upload_url()
            .ok_or(GraphError::MissingUploadUrl)?
            .to_string();
        let (start, end) = range.chunk_span(self.file_size, self.max_chunk_size)?;
        let length = end - start + 1;

        self.stream.seek(SeekFrom::Start(start)).await?;
        let mut chunk = vec![0u8; length as usize];
        self.stream.read_exact(&mut chunk).await?;

        let mut request = RequestInformation::new(HttpMethod::Put, upload_url);
        request.set_stream_content(chunk);
        request.headers.insert(
            "Content-Range",
            format!("bytes {}-{}/{}", start, end, self.file_size),
        );
        request.headers.insert("Content-Length", length.to_string());

        debug!("Uploading bytes {}-{}/{}", start, end, self.file_size);
        let response = self
            .adapter
            .send_checked(request, Some(&self.error_mappings))
            .await?;
        self.uploaded_chunks += 1;

        self.apply_chunk_response(response)
    }

    /// Delete the session on the server and mark it cancelled.
    pub async fn cancel(&mut self) -> Result<UploadSession> {
        let upload_url = self
            .upload_session
            .validated_upload_url()
            .ok_or(GraphError::MissingUploadUrl)?
            .to_string();

        let request = RequestInformation::new(HttpMethod::Delete, upload_url);
        self.adapter
            .send_no_content(request, Some(&self.error_mappings))
            .await?;

        self.upload_session.is_cancelled = Some(true);
        self.cancellation.cancel();
        info!("Upload session cancelled");
        Ok(self.upload_session.clone())
    }

    /// Ask the server which ranges it still expects.
    pub async fn refresh_session_status(&mut self) -> Result<UploadSession> {
        let upload_url = self
            .upload_session
            .validated_upload_url()
            .ok_or(GraphError::MissingUploadUrl)?
            .to_string();

        let request = RequestInformation::new(HttpMethod::Get, upload_url);
        let session: UploadSession = self
            .adapter
            .send_json(request, Some(&self.error_mappings))
            .await?;

        self.replace_session(session)?;
        if let Some(first) = self.next_range {
            self.uploaded_bytes = first.start;
        }
        Ok(self.upload_session.clone())
    }

    fn ensure_uploadable(&self) -> Result<()> {
        if self.upload_session.is_cancelled() || self.cancellation.is_cancelled() {
            return Err(GraphError::Cancelled);
        }
        if self.upload_session_expired(None)? {
            return Err(GraphError::SessionExpired);
        }
        Ok(())
    }

    async fn run_pipeline<F>(&mut self, mut on_chunk_complete: F) -> Result<UploadResult>
    where
        F: FnMut(&Self) + Send,
    {
        loop {
            if self.cancellation.is_cancelled() {
                info!("Upload stopped by cancellation after {} chunks", self.uploaded_chunks);
                return Err(GraphError::Cancelled);
            }
            if self.upload_session_expired(None)? {
                return Err(GraphError::SessionExpired);
            }

            let range = match self.next_range {
                Some(range) => range,
                // A fresh session that lists no ranges starts at the beginning
                None if self.uploaded_chunks == 0
                    && self.upload_session.next_expected_ranges.is_empty() =>
                {
                    ByteRange::open(0)
                }
                None => return Err(GraphError::NoRangesRemaining),
            };
            let session = self.next_chunk(range).await?;
            on_chunk_complete(&*self);

            if session.is_complete() {
                info!(
                    "Upload complete: {} bytes in {} chunks",
                    self.file_size, self.uploaded_chunks
                );
                return Ok(UploadResult {
                    upload_session: session,
                    item_response: self.item_response.clone(),
                    location: self.location.clone(),
                });
            }
        }
    }

    /// Fold a 2xx chunk response into the task state.
    ///
    /// A response with outstanding `nextExpectedRanges` is an in-progress
    /// session; anything else is the completion response.
    fn apply_chunk_response(&mut self, response: RawResponse) -> Result<UploadSession> {
        let value: Value = if response.body.is_empty() {
            Value::Null
        } else {
            response.json()?
        };

        let has_pending_ranges = value
            .get("nextExpectedRanges")
            .and_then(Value::as_array)
            .map(|ranges| !ranges.is_empty())
            .unwrap_or(false);

        if has_pending_ranges {
            let session: UploadSession = serde_json::from_value(value)?;
            self.replace_session(session)?;
            if let Some(next) = self.next_range {
                self.uploaded_bytes = next.start;
                debug!("Server expects range {} next", next);
            }
        } else {
            self.upload_session.next_expected_ranges.clear();
            self.next_range = None;
            self.uploaded_bytes = self.file_size;
            self.location = response.header("location").map(str::to_string);
            self.item_response = (!value.is_null()).then_some(value);
        }

        Ok(self.upload_session.clone())
    }

    /// Swap in a session from the server, keeping known URL and deadline
    /// when the new one omits them.
    ///
    /// An unparseable first range fails with [`GraphError::InvalidRange`]
    /// and leaves the task state untouched.
    fn replace_session(&mut self, mut session: UploadSession) -> Result<()> {
        if session.validated_upload_url().is_none() {
            session.upload_url = self.upload_session.upload_url.clone();
        }
        if session.expiration_date_time.is_none() {
            session.expiration_date_time = self.upload_session.expiration_date_time;
        }
        if session.is_cancelled.is_none() {
            session.is_cancelled = self.upload_session.is_cancelled;
        }
        self.next_range = session
            .next_expected_ranges
            .first()
            .map(|range| range.parse::<ByteRange>())
            .transpose()?;
        self.upload_session = session;
        Ok(())
    }
}
