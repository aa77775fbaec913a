//! Error types for the digest fetchers
//!
//! This module defines the domain errors raised by the HTTP clients.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Non-success status code
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Body could not be decoded into the expected shape
    #[error("Decoding error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Classify a transport error, separating timeouts from the rest
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimit | Self::Timeout => true,
            Self::Status(code) => matches!(code, 429 | 500 | 502 | 503 | 504),
            Self::Http(e) => e.is_connect() || e.is_request(),
            Self::Decode(_) => false,
        }
    }
}

/// Errors raised by the Reddit API client
#[derive(Error, Debug)]
pub enum RedditError {
    /// Credentials were rejected or the token endpoint failed
    #[error("Reddit authentication failed: {0}")]
    Auth(String),

    /// The subreddit does not exist (404 or redirect to search)
    #[error("Subreddit r/{0} not found")]
    SubredditNotFound(String),

    /// The resource exists but is private, quarantined or banned
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Any other 404
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Body did not match the expected listing shape
    #[error("Unexpected response from {path}: {reason}")]
    InvalidResponse { path: String, reason: String },

    /// Transport-level failure
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl RedditError {
    /// Whether the request should be attempted again
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Errors that must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Auth(_) | Self::SubredditNotFound(_) | Self::Forbidden(_)
        )
    }
}

/// Errors raised while authorizing with or uploading to Google Drive
#[derive(Error, Debug)]
pub enum UploadError {
    /// The OAuth client secrets file is absent
    #[error("Client secrets file not found: {0}")]
    MissingClientSecrets(String),

    /// Stored token or secrets could not be read or written
    #[error("Credential file error: {0}")]
    CredentialFile(String),

    /// OAuth exchange or refresh failed
    #[error("Authorization failed: {0}")]
    Auth(String),

    /// Drive or Docs API returned an error
    #[error("{api} API error ({status}): {body}")]
    Api {
        api: &'static str,
        status: u16,
        body: String,
    },

    /// Transport-level failure
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl From<reqwest::Error> for UploadError {
    fn from(err: reqwest::Error) -> Self {
        Self::Fetch(FetchError::from_transport(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_retryable() {
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Status(429).is_retryable());
        assert!(!FetchError::Status(404).is_retryable());
        assert!(!FetchError::Decode("bad".into()).is_retryable());
    }

    #[test]
    fn test_reddit_fatal() {
        assert!(RedditError::Auth("401".into()).is_fatal());
        assert!(RedditError::SubredditNotFound("nope".into()).is_fatal());
        assert!(!RedditError::NotFound("/user/x/about".into()).is_fatal());
        assert!(!RedditError::Fetch(FetchError::Timeout).is_fatal());
    }

    #[test]
    fn test_reddit_retryable_delegates() {
        assert!(RedditError::Fetch(FetchError::Timeout).is_retryable());
        assert!(!RedditError::Auth("x".into()).is_retryable());
    }
}
