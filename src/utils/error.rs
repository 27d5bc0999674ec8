//! Error types for fetching and parsing NHC documents
//!
//! This module defines the low-level error types shared by the fetcher,
//! the feed parsers and the time resolver.

use thiserror::Error;

/// Errors that can occur during HTTP fetching operations
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Document does not exist (404)
    #[error("Document not found: {0}")]
    NotFound(String),

    /// Document unchanged since the conditional token (304)
    #[error("Document not modified since last fetch")]
    NotModified,

    /// Any other non-200 status code
    #[error("Server error: {0}")]
    ServerError(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Content decoding error
    #[error("Decoding error: {0}")]
    Decode(String),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Endpoint reachability check failed
    #[error("Endpoint {url} failed validation: {reason}")]
    Validation { url: String, reason: String },
}

impl FetchError {
    /// Check if retrying the same request later may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::NotModified | Self::Timeout | Self::Validation { .. } => true,
            Self::ServerError(status) => *status >= 500 || *status == 429,
            Self::NotFound(_) | Self::Decode(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur while parsing feed and advisory documents
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Document is not well-formed
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// Expected field absent in an otherwise well-formed document
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Timezone abbreviation has no known geographic mapping
    #[error("Unknown timezone abbreviation: {0}")]
    UnknownTimezone(String),

    /// Clock time text could not be interpreted
    #[error("Invalid advisory time: {0}")]
    InvalidTime(String),
}

impl ParseError {
    /// Create a malformed document error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Create an invalid time error
    pub fn invalid_time(text: impl Into<String>) -> Self {
        Self::InvalidTime(text.into())
    }
}
