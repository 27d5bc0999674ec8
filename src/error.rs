//! Crate-level error type
//!
//! Each subsystem keeps its own error enum ([`FetchError`], [`ParseError`],
//! [`TrackerError`], [`ChannelError`]). [`Error`] wraps them for callers that
//! only care how to react: retry later or give up.
//!
//! ```rust,ignore
//! use stormwatch::error::{Error, StormwatchErrorTrait};
//!
//! fn report(err: Error) {
//!     if err.is_recoverable() {
//!         tracing::warn!(category = %err.category(), "{err}");
//!     } else {
//!         tracing::error!(category = %err.category(), "{err}");
//!     }
//! }
//! ```

use std::fmt;
use thiserror::Error;

pub use crate::notifications::ChannelError;
pub use crate::tracker::error::TrackerError;
pub use crate::utils::error::{FetchError, ParseError};

/// Shared classification for every stormwatch error
pub trait StormwatchErrorTrait: std::error::Error {
    /// Whether repeating the same operation later may succeed
    fn is_recoverable(&self) -> bool;

    fn category(&self) -> ErrorCategory;
}

/// Where an error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// HTTP failures, timeouts and non-success statuses
    Network,
    /// Documents that could not be read, including unresolvable times
    Parsing,
    /// Posting to the notification sink
    Delivery,
    /// Settings rejected before any request was made
    Config,
    Other,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Delivery => "delivery",
            Self::Config => "config",
            Self::Other => "other",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Notification(#[from] ChannelError),
}

impl StormwatchErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        FetchError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Decode(_) => ErrorCategory::Parsing,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            _ => ErrorCategory::Network,
        }
    }
}

impl StormwatchErrorTrait for ParseError {
    fn is_recoverable(&self) -> bool {
        // the next published advisory may parse fine
        !matches!(self, Self::UnknownTimezone(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Parsing
    }
}

impl StormwatchErrorTrait for TrackerError {
    fn is_recoverable(&self) -> bool {
        TrackerError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::FeedUnavailable { source, .. } => source.category(),
            Self::FeedMalformed { .. } => ErrorCategory::Parsing,
            Self::ShuttingDown => ErrorCategory::Other,
        }
    }
}

impl StormwatchErrorTrait for ChannelError {
    fn is_recoverable(&self) -> bool {
        self.is_retryable()
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig(_) => ErrorCategory::Config,
            _ => ErrorCategory::Delivery,
        }
    }
}

impl Error {
    fn inner(&self) -> &dyn StormwatchErrorTrait {
        match self {
            Self::Fetch(e) => e,
            Self::Parse(e) => e,
            Self::Tracker(e) => e,
            Self::Notification(e) => e,
        }
    }
}

impl StormwatchErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        self.inner().is_recoverable()
    }

    fn category(&self) -> ErrorCategory {
        self.inner().category()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
