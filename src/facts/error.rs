//! Error types for fact store operations

use std::fmt;

/// Result type alias for fact store operations
pub type FactResult<T> = Result<T, FactStoreError>;

/// Errors that can occur while talking to the key/value backend
#[derive(Debug)]
pub enum FactStoreError {
    /// The backend could not be reached (connection refused, timeout, ...)
    BackendUnavailable(String),

    /// The backend answered, but with an error status
    BackendError(String),

    /// Nothing is stored below the requested prefix
    NotFound(String),

    /// A write was attempted to an unusable path
    MalformedPath(String),

    /// The backend answered with something we could not decode
    DecodeError(String),
}

impl fmt::Display for FactStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactStoreError::BackendUnavailable(msg) => {
                write!(f, "key/value backend unavailable: {}", msg)
            }
            FactStoreError::BackendError(msg) => write!(f, "key/value backend error: {}", msg),
            FactStoreError::NotFound(prefix) => write!(f, "no facts stored below {}", prefix),
            FactStoreError::MalformedPath(path) => write!(f, "malformed key path: {:?}", path),
            FactStoreError::DecodeError(msg) => {
                write!(f, "could not decode backend response: {}", msg)
            }
        }
    }
}

impl std::error::Error for FactStoreError {}

impl From<reqwest::Error> for FactStoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            FactStoreError::BackendUnavailable(err.to_string())
        } else if err.is_decode() {
            FactStoreError::DecodeError(err.to_string())
        } else {
            FactStoreError::BackendError(err.to_string())
        }
    }
}

impl From<base64::DecodeError> for FactStoreError {
    fn from(err: base64::DecodeError) -> Self {
        FactStoreError::DecodeError(err.to_string())
    }
}
