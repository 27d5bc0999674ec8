use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use stormwatch::config::Config;
use stormwatch::error::{Error, StormwatchErrorTrait};
use stormwatch::feed::HttpFetcher;
use stormwatch::metrics;
use stormwatch::notifications::{
    ConsoleChannel, NotificationSink, Notifier, WebhookChannel, WebhookConfig,
};
use stormwatch::tracker::{SystemClock, TrackingCoordinator};
use stormwatch::utils::retry::RetryConfig;

use super::chat::{execute, ChatCommand, CONSOLE_CONTEXT};

/// Build the notification sink and its starting destination
fn build_notifier(config: &Config) -> Result<Notifier> {
    let display_tz = config.display_timezone()?;

    let (sink, default_destination): (Arc<dyn NotificationSink>, Option<String>) =
        match &config.notify.webhook_url {
            Some(url) => {
                let mut webhook = WebhookConfig::new(url.clone());
                if let Some(token) = &config.notify.webhook_token {
                    webhook = webhook.with_auth_token(token.clone());
                }
                let channel = WebhookChannel::new(webhook).context("Invalid webhook configuration")?;
                (Arc::new(channel), None)
            }
            None => (
                Arc::new(ConsoleChannel::new()),
                Some(CONSOLE_CONTEXT.to_string()),
            ),
        };

    let notifier = Notifier::new(sink, display_tz);
    Ok(match config.notify.destination.clone().or(default_destination) {
        Some(destination) => notifier.with_destination(destination),
        None => notifier,
    })
}

/// Run the tracker until interrupted
///
/// Commands are read line by line from stdin and answered on stdout.
pub async fn run(config: Config) -> Result<()> {
    if let Err(e) = metrics::init_metrics() {
        tracing::warn!(error = %e, "Failed to initialize metrics");
    }

    let fetcher = Arc::new(HttpFetcher::from_config(&config.http)?);
    let notifier = Arc::new(build_notifier(&config)?);
    let coordinator = Arc::new(TrackingCoordinator::from_config(
        &config,
        fetcher,
        notifier,
        Arc::new(SystemClock),
    ));

    println!("National Hurricane Center Storm Tracker");
    println!("  Basin feed: {}", config.feed.basin_url);
    println!("  Strengths: {}", config.feed.strengths.join(", "));
    println!("  Scan interval: {}s", config.schedule.scan_interval_secs);
    println!("Type `help` for commands.");
    println!();

    let bootstrap_retry = RetryConfig::with_delays(3, 5_000, 60_000);
    if let Err(e) = coordinator.bootstrap(&bootstrap_retry).await {
        let err = Error::from(e);
        tracing::error!(
            error = %err,
            category = %err.category(),
            recoverable = err.is_recoverable(),
            "Initial basin scan failed"
        );
        return Err(err).context("Could not read the basin feed at startup");
    }

    let scan_loop = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received");
                break;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let command = ChatCommand::parse(&line);
                    tracing::debug!(?command, "Console command");
                    println!("{}", execute(&coordinator, &command, CONSOLE_CONTEXT).await);
                }
                Ok(None) => {
                    tracing::info!("stdin closed; running until interrupted");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    stdin_open = false;
                }
            },
        }
    }

    coordinator.shutdown().await;
    if let Err(e) = scan_loop.await {
        tracing::warn!(error = %e, "Scan loop task failed");
    }

    match metrics::encode_metrics() {
        Ok(text) => tracing::debug!(metrics = %text, "Final metrics"),
        Err(e) => tracing::debug!(error = %e, "Metrics unavailable"),
    }

    Ok(())
}
