//! Webhook notification channel
//!
//! Posts advisory text as JSON to a chat relay endpoint, which forwards it
//! to the channel named in the payload.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ChannelError, ChannelResult, DeliveryStatus, NotificationSink};
use crate::utils::retry::{with_retry_if, RetryConfig};

/// Relay endpoint settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// Sent as a bearer token when present
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default = "WebhookConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra attempts after a retryable failure
    #[serde(default = "WebhookConfig::default_max_retries")]
    pub max_retries: u32,
}

impl WebhookConfig {
    fn default_timeout_secs() -> u64 {
        10
    }

    fn default_max_retries() -> u32 {
        3
    }

    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth_token: None,
            timeout_secs: Self::default_timeout_secs(),
            max_retries: Self::default_max_retries(),
        }
    }

    pub fn with_auth_token(self, token: impl Into<String>) -> Self {
        Self {
            auth_token: Some(token.into()),
            ..self
        }
    }

    pub fn with_timeout(self, timeout_secs: u64) -> Self {
        Self {
            timeout_secs,
            ..self
        }
    }

    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            max_retries,
            ..self
        }
    }

    /// Reject non-HTTP(S) URLs and a zero timeout
    pub fn validate(&self) -> ChannelResult<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| ChannelError::InvalidConfig(format!("webhook URL {:?}: {e}", self.url)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ChannelError::InvalidConfig(format!(
                "webhook URL must be http(s), got {}",
                parsed.scheme()
            )));
        }

        if self.timeout_secs == 0 {
            return Err(ChannelError::InvalidConfig(
                "webhook timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Body of one relay request
#[derive(Debug, Serialize)]
struct RelayPost<'a> {
    channel_id: &'a str,
    content: &'a str,
}

/// Webhook notification channel
///
/// # Payload Format
///
/// ```json
/// {
///   "channel_id": "1021234567",
///   "content": "**Hurricane Ian Public Advisory Number 20**\nhttps://...png\nNext complete advisory at 11:00 PM"
/// }
/// ```
pub struct WebhookChannel {
    config: WebhookConfig,
    client: Client,
}

impl WebhookChannel {
    /// # Errors
    ///
    /// `ChannelError::InvalidConfig` for a bad URL or timeout, `HttpError`
    /// if the client cannot be built
    pub fn new(config: WebhookConfig) -> ChannelResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn from_url(url: impl Into<String>) -> ChannelResult<Self> {
        Self::new(WebhookConfig::new(url))
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn retry_policy(&self) -> RetryConfig {
        RetryConfig::with_delays(self.config.max_retries, 1_000, 8_000)
    }

    async fn post_once(&self, post: &RelayPost<'_>) -> ChannelResult<()> {
        let mut request = self.client.post(&self.config.url).json(post);
        if let Some(token) = &self.config.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        Err(ChannelError::Rejected {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        })
    }
}

#[async_trait]
impl NotificationSink for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn send(&self, destination: &str, text: &str) -> ChannelResult<DeliveryStatus> {
        let post = RelayPost {
            channel_id: destination,
            content: text,
        };

        with_retry_if(
            &self.retry_policy(),
            || self.post_once(&post),
            ChannelError::is_retryable,
        )
        .await?;

        tracing::debug!(url = %self.config.url, destination = %destination, "Webhook delivered");
        Ok(DeliveryStatus::delivered(self.name(), destination))
    }
}
