//! Error types for the tracker module

use std::fmt;

use crate::utils::error::{FetchError, ParseError};

/// Result type for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Tracker-level failures
///
/// Admission outcomes (already tracked, blacklisted, not found) are not
/// errors; see [`crate::tracker::registry::Rejection`] and
/// [`crate::tracker::coordinator::TrackOutcome`].
#[derive(Debug)]
pub enum TrackerError {
    /// The basin feed could not be fetched
    FeedUnavailable { url: String, source: FetchError },

    /// The basin feed is not a well-formed document
    FeedMalformed { url: String, source: ParseError },

    /// The tracker was asked to do something after shutdown
    ShuttingDown,
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeedUnavailable { url, source } => {
                write!(f, "Basin feed {} unavailable: {}", url, source)
            }
            Self::FeedMalformed { url, source } => {
                write!(f, "Basin feed {} malformed: {}", url, source)
            }
            Self::ShuttingDown => write!(f, "Tracker is shutting down"),
        }
    }
}

impl std::error::Error for TrackerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FeedUnavailable { source, .. } => Some(source),
            Self::FeedMalformed { source, .. } => Some(source),
            Self::ShuttingDown => None,
        }
    }
}

impl TrackerError {
    pub fn feed_unavailable(url: impl Into<String>, source: FetchError) -> Self {
        Self::FeedUnavailable {
            url: url.into(),
            source,
        }
    }

    pub fn feed_malformed(url: impl Into<String>, source: ParseError) -> Self {
        Self::FeedMalformed {
            url: url.into(),
            source,
        }
    }

    /// Check if a later scan may succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::FeedUnavailable { source, .. } => source.is_recoverable(),
            Self::FeedMalformed { .. } => true,
            Self::ShuttingDown => false,
        }
    }
}
