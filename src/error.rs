//! Error types for chatlog-dl
//!
//! This module provides the error taxonomy for the library:
//! - Typed remote-call outcomes (rate limited, unauthenticated, denied, missing)
//! - Storage errors for the append-only export artifact
//! - Conversions from the underlying network/serialization/I/O error types
//!
//! Remote-call failures carry the HTTP status as data, never as text a caller
//! would have to pattern-match.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for chatlog-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chatlog-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "fetch.page_limit")
        key: Option<String>,
    },

    /// No credential available for the remote API
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Credential was rejected or lacks permission for the channel
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Channel or server does not exist (or is invisible to the credential)
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote API signaled throttling (HTTP 429-equivalent)
    ///
    /// The only retryable failure. `retry_after` is the server's hint, when
    /// one was supplied; the retry layer treats it as a lower bound on the
    /// backoff sleep.
    #[error("rate limited by remote API")]
    RateLimited {
        /// Server-supplied wait hint from the `Retry-After` header
        retry_after: Option<Duration>,
    },

    /// Remote API returned a non-2xx status outside the dedicated variants
    #[error("API error: HTTP {status}: {message}")]
    Api {
        /// The HTTP status code returned by the remote API
        status: u16,
        /// Response body or status text accompanying the failure
        message: String,
    },

    /// A fetched record could not be interpreted as a message
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// A timestamp argument could not be parsed
    #[error("invalid timestamp {input:?}: {reason}")]
    InvalidTimestamp {
        /// The input string that failed to parse
        input: String,
        /// Why the input was rejected
        reason: String,
    },

    /// Export artifact storage error
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Scrape was cancelled via its cancellation token
    #[error("scrape cancelled")]
    Cancelled,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the append-only export store
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to create the artifact or its parent directory
    #[error("failed to create export artifact {path}: {reason}")]
    CreateFailed {
        /// Path of the artifact that could not be created
        path: PathBuf,
        /// Why creation failed
        reason: String,
    },

    /// Failed to append rows to an existing artifact
    #[error("failed to append to export artifact {path}: {reason}")]
    AppendFailed {
        /// Path of the artifact that could not be appended to
        path: PathBuf,
        /// Why the append failed
        reason: String,
    },

    /// Failed to re-scan the artifact for statistics
    #[error("failed to scan export artifact {path}: {reason}")]
    ScanFailed {
        /// Path of the artifact that could not be scanned
        path: PathBuf,
        /// Why the scan failed
        reason: String,
    },
}

impl Error {
    /// Map an HTTP status code to the matching error variant
    ///
    /// 429 maps to [`Error::RateLimited`], 401 to [`Error::Unauthenticated`],
    /// 403 to [`Error::AccessDenied`] and 404 to [`Error::NotFound`]; any
    /// other non-success status becomes [`Error::Api`] carrying the code.
    pub fn from_status(
        status: u16,
        message: impl Into<String>,
        retry_after: Option<Duration>,
    ) -> Self {
        match status {
            429 => Error::RateLimited { retry_after },
            401 => Error::Unauthenticated(message.into()),
            403 => Error::AccessDenied(message.into()),
            404 => Error::NotFound(message.into()),
            _ => Error::Api {
                status,
                message: message.into(),
            },
        }
    }
}
