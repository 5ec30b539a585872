//! HTTP plumbing
//!
//! Request descriptions, the adapter seam the protocol components depend
//! on, and the reqwest-backed adapter used in production.

pub mod adapter;
pub mod client;
pub mod request;

pub use adapter::{ErrorFactory, ErrorMappings, RawResponse, RequestAdapter};
pub use client::GraphRequestAdapter;
pub use request::{HttpMethod, RequestHeaders, RequestInformation, RequestOption};
