//! Error types for the authorization engine
//!
//! Denials are not errors: they come back as [`crate::Decision::Deny`].
//! Everything here is a startup-time failure that must stop the process.

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Policy or scope table is malformed
    #[error("Misconfigured policy: {0}")]
    MisconfiguredPolicy(String),

    /// Invalid runtime configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Policy document could not be parsed
    #[error("Invalid policy document: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
