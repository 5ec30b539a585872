//! msgraph-core - Microsoft Graph SDK core protocols
//!
//! Resumable chunked uploads, page iteration over server-paged collections
//! and JSON batching, on top of a pluggable request adapter with
//! authentication, telemetry and retry handling.

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod paging;
pub mod upload;
pub mod utils;

// Re-export commonly used types
pub use auth::{AllowedHosts, AuthProvider, StaticTokenProvider, TokenCredentialAuthProvider};
pub use batch::{
    BatchRequestBuilder, BatchRequestConfiguration, BatchRequestContent, BatchRequestItem,
    BatchResponseContent, BatchResponseItem,
};
pub use config::{ApiVersion, ClientConfig, NationalCloud};
pub use error::{ApiError, GraphError, Result};
pub use http::{
    ErrorMappings, GraphRequestAdapter, HttpMethod, RawResponse, RequestAdapter,
    RequestInformation, RequestOption,
};
pub use models::{ODataError, PageResult, UploadSession, UploadSessionRequestBody};
pub use paging::{IterationState, PageIterator};
pub use upload::{create_upload_session, ByteRange, LargeFileUploadTask, UploadResult};
