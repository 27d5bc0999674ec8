//! HTTP fetcher for NHC feeds
//!
//! This module provides the production [`DocumentFetcher`] with:
//! - Rate limiting with governor
//! - Conditional requests (`If-Modified-Since`)
//! - HEAD-based endpoint validation
//! - Charset detection with a Windows-1252 fallback

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED},
    Client, Response, StatusCode,
};
use std::num::NonZeroU32;
use std::time::Duration;

use super::{DocumentFetcher, FetchedDocument};
use crate::config::HttpConfig;
use crate::utils::error::FetchError;

/// Fetcher for NHC RSS/XML documents
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Rate limiter to control request frequency
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpFetcher {
    /// Create a new fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        Self::with_config(
            requests_per_second,
            Duration::from_secs(30),
            &format!("stormwatch/{}", env!("CARGO_PKG_VERSION")),
        )
    }

    /// Create a fetcher from the `[http]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &HttpConfig) -> Result<Self, FetchError> {
        Self::with_config(
            config.requests_per_second,
            Duration::from_secs(config.request_timeout_secs),
            &config.user_agent,
        )
    }

    /// Create a new fetcher with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(
        requests_per_second: u32,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .user_agent(user_agent)
            .build()?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// Map a non-200 status to the matching error
    fn status_error(url: &str, status: StatusCode) -> FetchError {
        match status {
            StatusCode::NOT_MODIFIED => FetchError::NotModified,
            StatusCode::NOT_FOUND => FetchError::NotFound(url.to_string()),
            other => FetchError::ServerError(other.as_u16()),
        }
    }

    fn map_send_error(e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(e)
        }
    }

    fn build_headers(last_modified: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/rss+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5"),
        );

        if let Some(value) = last_modified.and_then(|token| HeaderValue::from_str(token).ok()) {
            headers.insert(IF_MODIFIED_SINCE, value);
        }

        headers
    }

    /// Decode response body honoring the declared charset
    async fn decode_response(&self, response: Response) -> Result<String, FetchError> {
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await?;

        Self::decode_bytes(&bytes, &content_type)
    }

    /// Decode bytes to a UTF-8 string
    ///
    /// Strategy:
    /// 1. Charset named in the Content-Type header
    /// 2. Strict UTF-8
    /// 3. Windows-1252 (what ISO-8859-1 labelled feeds really are)
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Decode` if the declared charset fails to decode
    pub fn decode_bytes(bytes: &[u8], content_type: &str) -> Result<String, FetchError> {
        let declared = content_type
            .to_lowercase()
            .split(';')
            .filter_map(|part| part.trim().strip_prefix("charset=").map(str::to_string))
            .next()
            .and_then(|label| Encoding::for_label(label.trim_matches('"').as_bytes()));

        if let Some(encoding) = declared {
            let (cow, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                return Err(FetchError::Decode(format!(
                    "{} decoding errors",
                    encoding.name()
                )));
            }
            return Ok(cow.into_owned());
        }

        let (cow, _, had_errors) = UTF_8.decode(bytes);
        if !had_errors {
            return Ok(cow.into_owned());
        }

        let (cow, _, _) = WINDOWS_1252.decode(bytes);
        Ok(cow.into_owned())
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        last_modified: Option<&str>,
    ) -> Result<FetchedDocument, FetchError> {
        url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, conditional = last_modified.is_some(), "Fetching document");

        let response = self
            .client
            .get(url)
            .headers(Self::build_headers(last_modified))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Self::status_error(url, status));
        }

        let token = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let body = self.decode_response(response).await?;

        Ok(FetchedDocument {
            body,
            last_modified: token,
        })
    }

    async fn validate(&self, url: &str) -> Result<(), FetchError> {
        url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{url}: {e}")))?;

        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| FetchError::Validation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => Err(FetchError::Validation {
                url: url.to_string(),
                reason: format!("status {}", status.as_u16()),
            }),
        }
    }
}
