//! Error types for the cache capability.
//!
//! Caller-facing mutation failures are [`MutationError`](crate::MutationError);
//! this module covers what a [`SwrCache`](crate::SwrCache) implementation or a
//! remote call may return before it gets wrapped.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache and remote operations.
///
/// Every variant carries a discriminator available through [`Error::name`],
/// which is what [`MutationError`](crate::MutationError) classification looks at.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a payload to or from JSON.
    SerializationError(String),

    /// Cache storage error.
    ///
    /// This indicates the cache rejected a read or write.
    /// Common causes:
    /// - Cache poisoned or shut down
    /// - Custom backend lost its connection
    ///
    /// **Recovery:** Retry the operation.
    BackendError(String),

    /// Network failure while talking to the remote source.
    ///
    /// Common causes:
    /// - Connection refused or reset
    /// - DNS failure
    /// - Fetch aborted
    ///
    /// **Recovery:** Retry once connectivity is back.
    NetworkError(String),

    /// Operation exceeded a timeout threshold.
    Timeout(String),

    /// Payload rejected by the remote source.
    ValidationError(String),

    /// Feature not implemented by this backend.
    NotImplemented(String),

    /// Generic error with custom message.
    Other(String),
}

impl Error {
    /// Discriminator string for this error kind.
    pub fn name(&self) -> &'static str {
        match self {
            Error::SerializationError(_) => "SerializationError",
            Error::BackendError(_) => "BackendError",
            Error::NetworkError(_) => "NetworkError",
            Error::Timeout(_) => "TimeoutError",
            Error::ValidationError(_) => "ValidationError",
            Error::NotImplemented(_) => "NotImplementedError",
            Error::Other(_) => "Error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::NetworkError(msg) => write!(f, "Network error: {}", msg),
            Error::Timeout(msg) => write!(f, "Timeout: {}", msg),
            Error::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Error::NotImplemented(msg) => write!(f, "Not implemented: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::BackendError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;

        match e.kind() {
            ErrorKind::TimedOut => Error::Timeout(e.to_string()),
            ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe => Error::NetworkError(e.to_string()),
            _ => Error::BackendError(e.to_string()),
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}
