//! Standard output sink, used when no webhook is configured

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{ChannelResult, DeliveryStatus, NotificationSink};

/// Prints posts to stdout, prefixed with the destination
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleChannel;

impl ConsoleChannel {
    pub fn new() -> Self {
        Self
    }

    fn render(destination: &str, text: &str) -> String {
        format!("[{destination}]\n{text}\n\n")
    }
}

#[async_trait]
impl NotificationSink for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn send(&self, destination: &str, text: &str) -> ChannelResult<DeliveryStatus> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(Self::render(destination, text).as_bytes())
            .await?;
        stdout.flush().await?;

        Ok(DeliveryStatus::delivered(self.name(), destination))
    }
}
