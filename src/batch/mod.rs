//! JSON batching: many logical requests in one `$batch` call

pub mod builder;
pub mod request;
pub mod response;

pub use builder::{BatchRequestBuilder, BatchRequestConfiguration};
pub use request::{relative_batch_url, BatchRequestContent, BatchRequestItem, MAX_REQUESTS};
pub use response::{BatchResponseContent, BatchResponseItem};
