//! Error handling module for colabstrap
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All library operations return these types for consistency.

use thiserror::Error;

/// Main error type for the bootstrap configurator
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// IO errors (credential files, directories, terminal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors (secrets, config)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors (malformed identifiers, incomplete secret groups)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Credentials are partially configured
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// No usable GPU runtime
    #[error("No accelerator available: {0}")]
    NoAccelerator(String),

    /// External command could not be run where its output is required
    #[error("Command failed: {0}")]
    Command(String),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Interactive secret prompt was aborted or failed
    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Result type alias for colabstrap operations
pub type Result<T> = std::result::Result<T, BootstrapError>;

// Convenient error constructors
impl BootstrapError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a missing-credentials error
    pub fn missing_credentials(msg: impl Into<String>) -> Self {
        Self::MissingCredentials(msg.into())
    }

    /// Create a no-accelerator error
    pub fn no_accelerator(msg: impl Into<String>) -> Self {
        Self::NoAccelerator(msg.into())
    }

    /// Create a command error
    pub fn command(msg: impl Into<String>) -> Self {
        Self::Command(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }
}
