//! Configuration management module
//!
//! This module handles the client configuration object, its loading from
//! files and environment variables, and the national cloud/API version tables.

pub mod cloud;
pub mod settings;

pub use cloud::*;
pub use settings::*;
