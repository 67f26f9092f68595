//! Error types for logstore-core
//!
//! Provides a unified error type shared by the store implementation and the CLI.
//! Each variant corresponds to one error kind a caller may want to act on.

use thiserror::Error;

/// Result type alias for logstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for logstore operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error (bad store URL, unusable endpoint, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Application name or call ID cannot be turned into an object key
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Bucket could neither be created nor found
    #[error("Provisioning failed: {0}")]
    Provision(String),

    /// Authentication or permission failure
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Network error (retryable)
    #[error("Network error: {0}")]
    Network(String),

    /// Context canceled or deadline exceeded
    #[error("Canceled: {0}")]
    Canceled(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// General error
    #[error("{0}")]
    General(String),
}

impl Error {
    /// Get the appropriate exit code for this error
    pub const fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::InvalidUrl(_) => 2, // UsageError
            Error::InvalidIdentifier(_) => 2,              // UsageError
            Error::Network(_) => 3,                        // NetworkError
            Error::Auth(_) | Error::Provision(_) => 4,     // AuthError
            Error::NotFound(_) => 5,                       // NotFound
            Error::Canceled(_) => 130,                     // Interrupted
            _ => 1,                                        // GeneralError
        }
    }

    /// Whether retrying the same call may succeed
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    /// Whether this error was caused by cancellation or an expired deadline
    pub const fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled(_))
    }

    /// Whether the requested object or bucket does not exist
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
