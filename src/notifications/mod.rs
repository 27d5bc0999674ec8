//! Advisory notifications
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │  Notifier                        │
//! │  - current destination           │
//! │  - post formatting (display tz)  │
//! └──────────────────────────────────┘
//!                 │
//!         ┌───────┴───────┐
//!         ▼               ▼
//!   ┌───────────┐   ┌───────────┐
//!   │  Webhook  │   │  Console  │
//!   │  Channel  │   │  Channel  │
//!   └───────────┘   └───────────┘
//! ```
//!
//! One destination is shared by every tracked cyclone. Until a destination
//! is set, posts are logged and dropped.

pub mod channels;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use std::sync::{Arc, RwLock};

pub use channels::{
    ChannelError, ChannelResult, ConsoleChannel, DeliveryStatus, NotificationSink, WebhookChannel,
    WebhookConfig,
};

/// Render an advisory post
///
/// `"**{title}**\n{image_url}\n{message} {HH:MM AM/PM}"`, with the next
/// advisory time converted to `display_tz`.
pub fn format_advisory_post<T: TimeZone>(
    title: &str,
    image_url: &str,
    message: &str,
    next_at: &DateTime<T>,
    display_tz: Tz,
) -> String {
    let local = next_at.with_timezone(&display_tz);
    format!(
        "**{title}**\n{image_url}\n{message} {}",
        local.format("%I:%M %p")
    )
}

/// Outcome of one post attempt
#[derive(Debug)]
pub enum PostOutcome {
    Delivered(DeliveryStatus),
    /// No destination configured yet
    NoDestination,
    Failed(ChannelError),
}

/// Routes formatted posts to the shared destination
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    destination: RwLock<Option<String>>,
    display_tz: Tz,
}

impl Notifier {
    pub fn new(sink: Arc<dyn NotificationSink>, display_tz: Tz) -> Self {
        Self {
            sink,
            destination: RwLock::new(None),
            display_tz,
        }
    }

    pub fn with_destination(self, destination: impl Into<String>) -> Self {
        self.set_destination(destination);
        self
    }

    /// Replace the destination for all future posts
    pub fn set_destination(&self, destination: impl Into<String>) {
        let destination = destination.into();
        tracing::info!(destination = %destination, "Notification destination set");
        let mut guard = self
            .destination
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(destination);
    }

    pub fn destination(&self) -> Option<String> {
        self.destination
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    /// Format and deliver an advisory post
    pub async fn post_advisory<T: TimeZone>(
        &self,
        title: &str,
        image_url: &str,
        message: &str,
        next_at: &DateTime<T>,
    ) -> PostOutcome {
        let text = format_advisory_post(title, image_url, message, next_at, self.display_tz);
        self.post(&text).await
    }

    /// Deliver an already formatted text
    pub async fn post(&self, text: &str) -> PostOutcome {
        let Some(destination) = self.destination() else {
            tracing::info!(
                post = %crate::utils::truncate_text(text, 120),
                "No destination set, dropping post"
            );
            return PostOutcome::NoDestination;
        };

        match self.sink.send(&destination, text).await {
            Ok(status) => {
                crate::metrics::record_notification(self.sink.name(), true);
                tracing::debug!(%status, "Advisory posted");
                PostOutcome::Delivered(status)
            }
            Err(e) => {
                crate::metrics::record_notification(self.sink.name(), false);
                tracing::error!(sink = self.sink.name(), error = %e, "Failed to deliver advisory");
                PostOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn send(&self, destination: &str, text: &str) -> ChannelResult<DeliveryStatus> {
            self.sent
                .lock()
                .unwrap()
                .push((destination.to_string(), text.to_string()));
            Ok(DeliveryStatus::delivered("recording", destination))
        }
    }

    #[test]
    fn test_format_advisory_post_in_display_timezone() {
        // 2022-09-28 03:00 UTC is 11:00 PM EDT the day before
        let next = Utc.with_ymd_and_hms(2022, 9, 28, 3, 0, 0).unwrap();
        let text = format_advisory_post(
            "Hurricane Ian Public Advisory Number 20",
            "https://www.nhc.noaa.gov/cone.png",
            "Next complete advisory at",
            &next,
            chrono_tz::America::New_York,
        );

        assert_eq!(
            text,
            "**Hurricane Ian Public Advisory Number 20**\nhttps://www.nhc.noaa.gov/cone.png\nNext complete advisory at 11:00 PM"
        );
    }

    #[test]
    fn test_format_converts_from_source_timezone() {
        let next = chrono_tz::America::Chicago
            .with_ymd_and_hms(2022, 9, 28, 10, 0, 0)
            .unwrap();
        let text = format_advisory_post("t", "i", "m", &next, chrono_tz::America::New_York);
        assert!(text.ends_with("m 11:00 AM"));
    }

    #[tokio::test]
    async fn test_post_without_destination_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let notifier = Notifier::new(sink.clone(), chrono_tz::America::New_York);

        assert!(matches!(
            notifier.post("hello").await,
            PostOutcome::NoDestination
        ));
        assert!(sink.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_goes_to_latest_destination() {
        let sink = Arc::new(RecordingSink::default());
        let notifier =
            Notifier::new(sink.clone(), chrono_tz::America::New_York).with_destination("first");
        notifier.set_destination("second");

        assert!(matches!(
            notifier.post("hello").await,
            PostOutcome::Delivered(_)
        ));

        let sent = sink.sent.lock().unwrap();
        assert_eq!(sent.as_slice(), &[("second".to_string(), "hello".to_string())]);
    }
}
