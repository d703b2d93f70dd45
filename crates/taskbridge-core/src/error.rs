//! Error types for taskbridge.

use thiserror::Error;

/// Main error type for taskbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed before a response was received
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials were rejected (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Credentials lack permission (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource does not exist (404 or empty lookup)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Upstream throttled the request (429)
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Upstream failed (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// API returned an error status not covered above
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// GraphQL endpoint answered 200 but reported errors
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// Upstream payload did not have the expected shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Two actions were registered under the same name
    #[error("Duplicate action: {0}")]
    DuplicateAction(String),

    /// Generic error
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            401 => Error::Unauthorized(message),
            403 => Error::Forbidden(message),
            404 => Error::NotFound(message),
            429 => Error::RateLimited(message),
            500..=599 => Error::ServerError { status, message },
            _ => Error::Api { status, message },
        }
    }

    /// Stable machine-readable code carried in error envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Http(_) => "HTTP_ERROR",
            Error::Unauthorized(_) => "UNAUTHORIZED",
            Error::Forbidden(_) => "FORBIDDEN",
            Error::NotFound(_) => "NOT_FOUND",
            Error::RateLimited(_) => "RATE_LIMITED",
            Error::ServerError { .. } => "SERVER_ERROR",
            Error::Api { .. } | Error::GraphQl(_) => "API_ERROR",
            Error::InvalidData(_) | Error::Serialization(_) => "INVALID_DATA",
            Error::Config(_) => "CONFIGURATION_ERROR",
            Error::Storage(_) => "STORAGE_ERROR",
            Error::DuplicateAction(_) => "DUPLICATE_ACTION",
            Error::Other(_) => "HANDLER_ERROR",
        }
    }
}

/// Result type alias for taskbridge operations.
pub type Result<T> = std::result::Result<T, Error>;
