//! Wire models shared by the protocol components
//!
//! Every model keeps fields it does not know about in an `additional_data`
//! bag so that payloads round-trip unchanged when the service adds fields.

pub mod odata_error;
pub mod page;
pub mod upload_session;

pub use odata_error::*;
pub use page::*;
pub use upload_session::*;

/// Fields not modelled by a type, keyed by wire name.
pub type AdditionalData = std::collections::HashMap<String, serde_json::Value>;
