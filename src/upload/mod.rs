//! Large file upload over Graph upload sessions

pub mod range;
pub mod task;

pub use range::ByteRange;
pub use task::{LargeFileUploadTask, UploadResult};

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::http::adapter::{ErrorMappings, RequestAdapter};
use crate::http::request::{HttpMethod, RequestInformation};
use crate::models::UploadSession;

/// POST `body` to a `createUploadSession` endpoint and return the new session.
///
/// `body` is usually an
/// [`UploadSessionRequestBody`](crate::models::UploadSessionRequestBody).
pub async fn create_upload_session<B>(
    adapter: &dyn RequestAdapter,
    body: &B,
    url: &str,
) -> Result<UploadSession>
where
    B: Serialize + ?Sized + Sync,
{
    let mut request = RequestInformation::new(HttpMethod::Post, url);
    request.set_json_content(body)?;
    request.headers.insert("Accept", "application/json");

    let session: UploadSession = adapter
        .send_json(request, Some(&ErrorMappings::odata()))
        .await?;
    info!(
        "Created upload session expiring at {}",
        session
            .expiration_date_time
            .map(|expiry| expiry.to_rfc3339())
            .unwrap_or_else(|| "<unknown>".to_string())
    );
    Ok(session)
}
