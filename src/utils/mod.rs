//! Utility functions module
//!
//! HTTP client construction, transport retry timing and timestamp handling
//! shared by the request adapter and the protocol components.

pub mod datetime;
pub mod network;
pub mod retry;

pub use network::*;
pub use retry::*;
