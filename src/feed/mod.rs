//! Raw document fetching
//!
//! The tracker never talks to HTTP directly; it goes through the
//! [`DocumentFetcher`] trait so that scans and scheduler ticks can run
//! against scripted documents in tests.

pub mod fetcher;

pub use fetcher::HttpFetcher;

use async_trait::async_trait;

use crate::utils::error::FetchError;

/// A successfully fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedDocument {
    /// Decoded body text
    pub body: String,
    /// `Last-Modified` token to send back on the next conditional fetch
    pub last_modified: Option<String>,
}

impl FetchedDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            last_modified: None,
        }
    }

    pub fn with_last_modified(mut self, token: impl Into<String>) -> Self {
        self.last_modified = Some(token.into());
        self
    }
}

/// Fetch primitive used by the basin scanner and the update scheduler
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch a document, conditionally on `last_modified` when given
    ///
    /// Anything but a 200 response is an error: `NotModified` for 304,
    /// `NotFound` for 404, `ServerError` otherwise.
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<&str>,
    ) -> Result<FetchedDocument, FetchError>;

    /// Check that an endpoint answers a HEAD request with 200
    async fn validate(&self, url: &str) -> Result<(), FetchError>;
}
