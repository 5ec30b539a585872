//! Authentication module for Microsoft Graph
//!
//! This module provides the bearer token providers the request adapter uses
//! to authorize calls, including azure_identity credentials (default chain
//! and client secret) and pre-acquired static tokens.

pub mod provider;

pub use provider::*;
