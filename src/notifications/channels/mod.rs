//! Notification sinks for delivering advisory posts
//!
//! A sink delivers an already formatted text to a destination identifier
//! (a chat channel id, a console context, ...).

pub mod console;
pub mod webhook;

pub use console::ConsoleChannel;
pub use webhook::{WebhookChannel, WebhookConfig};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type ChannelResult<T> = Result<T, ChannelError>;

/// Why a post was not delivered
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Relay request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Rejected before any post was attempted
    #[error("Invalid sink configuration: {0}")]
    InvalidConfig(String),

    /// Endpoint answered with a non-success status
    #[error("Delivery rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    /// Console output failed
    #[error("Console write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Client errors will not improve on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::HttpError(_) => true,
            Self::InvalidConfig(_) | Self::Io(_) => false,
        }
    }
}

/// Outcome of one delivered post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStatus {
    /// Sink that delivered the post
    pub channel: String,
    /// Destination the post went to
    pub destination: String,
    pub delivered_at: chrono::DateTime<chrono::Utc>,
}

impl DeliveryStatus {
    pub fn delivered(channel: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            destination: destination.into(),
            delivered_at: chrono::Utc::now(),
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] -> {}", self.channel, self.destination)
    }
}

/// Delivers formatted text to a destination
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Sink name for logs and metrics
    fn name(&self) -> &str;

    /// Deliver `text` to `destination`
    async fn send(&self, destination: &str, text: &str) -> ChannelResult<DeliveryStatus>;
}
