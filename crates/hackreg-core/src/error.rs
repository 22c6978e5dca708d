//! Error types for the registration pipeline
//!
//! This module defines all error types used throughout the crate.
//!
//! Expected business outcomes (unknown ticket, slot already redeemed) are not
//! errors: they are reported through [`crate::CheckInResult`]. The variants
//! below cover malformed input, backend failures and collaborator failures.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the registration pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed caller input (bad day/meal, missing fields, unparseable form)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Record not found in the store
    #[error("Record not found: {0}")]
    NotFound(String),

    /// The record store asked us to slow down
    #[error("Rate limited by record store (retry after {retry_after:?})")]
    RateLimited {
        /// Backend retry hint, if one was sent
        retry_after: Option<Duration>,
    },

    /// The store kept rate limiting until the retry budget ran out
    #[error("Gave up on {operation} after {attempts} attempt(s) due to rate limiting")]
    RetriesExhausted {
        /// Operation that was being retried
        operation: String,
        /// Attempts made, including the first
        attempts: usize,
    },

    /// Non-transient record store failure
    #[error("Record store error ({backend}): {message}")]
    Backend {
        /// Store name
        backend: String,
        /// Error message
        message: String,
    },

    /// A notification collaborator (email, chat, renderer) failed
    #[error("Notification error ({channel}): {message}")]
    Notification {
        /// Channel name
        channel: String,
        /// Error message
        message: String,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(retry_after: Option<Duration>) -> Self {
        Self::RateLimited { retry_after }
    }

    /// Create a record store error
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a notification error
    pub fn notification(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Notification {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Whether this error should be retried by the gateway
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether the store ran out of patience with us (rate limited, retries spent)
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::RetriesExhausted { .. })
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rate_limits_are_transient() {
        assert!(Error::rate_limited(None).is_transient());
        assert!(!Error::backend("notion", "validation_error").is_transient());
        assert!(!Error::not_found("page").is_transient());

        let exhausted = Error::RetriesExhausted {
            operation: "set_flag".to_string(),
            attempts: 5,
        };
        assert!(!exhausted.is_transient());
        assert!(exhausted.is_rate_limited());
    }

    #[test]
    fn display_names_the_backend() {
        let err = Error::backend("notion", "object_not_found");
        assert_eq!(err.to_string(), "Record store error (notion): object_not_found");
    }
}
