//! Error types for the cachekit client.

use thiserror::Error;

/// Errors that can occur when using the cachekit client.
#[derive(Error, Debug)]
pub enum Error {
    /// Failure in the underlying cache access layer
    #[error("cache error: {0}")]
    Cache(#[from] cachekit_core::CacheError),

    /// A stored value was not valid UTF-8
    #[error("stored value is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// JSON serialization error (requires the `json` feature)
    #[cfg(feature = "json")]
    #[error("serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization error (requires the `json` feature)
    #[cfg(feature = "json")]
    #[error("deserialization error: {0}")]
    Deserialization(#[source] serde_json::Error),
}

impl Error {
    /// Returns `true` if this error came from the connection to the server.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Error::Cache(cachekit_core::CacheError::Connection(_))
        )
    }
}
