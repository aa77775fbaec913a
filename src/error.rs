//! Unified error handling for the redigest crate
//!
//! This module provides a unified error type that consolidates the
//! domain-specific errors into a single `Error` enum, while keeping the
//! domain errors available where callers need to match on them.
//!
//! # Architecture
//!
//! - [`DigestErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

pub use crate::utils::error::{FetchError, RedditError, UploadError};

/// Common trait for redigest error types
pub trait DigestErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried or skipped)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, rate limit)
    Network,
    /// Response decoding errors
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Authentication and authorization errors
    Auth,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Auth => "auth",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the redigest crate
#[derive(Error, Debug)]
pub enum Error {
    /// Reddit API errors
    #[error("Reddit error: {0}")]
    Reddit(#[from] RedditError),

    /// Drive upload errors
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Local file, template or cache failure, with its context chain
    #[error("{0}")]
    Storage(String),
}

impl DigestErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Reddit(e) => !e.is_fatal() && e.is_retryable(),
            Self::Upload(UploadError::Fetch(e)) => e.is_retryable(),
            Self::Upload(_) => false,
            Self::Storage(_) => false,
            Self::Config(_) => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Reddit(RedditError::Auth(_)) | Self::Reddit(RedditError::Forbidden(_)) => {
                ErrorCategory::Auth
            }
            Self::Reddit(RedditError::InvalidResponse { .. }) => ErrorCategory::Parsing,
            Self::Reddit(_) => ErrorCategory::Network,
            Self::Upload(UploadError::Auth(_))
            | Self::Upload(UploadError::MissingClientSecrets(_)) => ErrorCategory::Auth,
            Self::Upload(UploadError::CredentialFile(_)) => ErrorCategory::Storage,
            Self::Upload(_) => ErrorCategory::Network,
            Self::Storage(_) => ErrorCategory::Storage,
            Self::Config(_) => ErrorCategory::Config,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Local storage code reports through `anyhow` contexts
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
