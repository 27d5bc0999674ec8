//! stormwatch - NHC tropical cyclone advisory tracker
//!
//! Polls a National Hurricane Center basin feed, tracks every active storm
//! worth following, and posts each new advisory on the storm's own cadence.
//!
//! # Layout
//!
//! - [`feed`] fetches raw documents under a shared rate limit
//! - [`parser`] reads basin and advisory feeds and resolves advisory times
//! - [`tracker`] owns the registry, the basin scanner and one scheduler per storm
//! - [`notifications`] formats posts and hands them to a sink
//! - [`config`], [`metrics`], [`models`] and [`utils`] support the above
//!
//! # Running a tracker
//!
//! ```no_run
//! use std::sync::Arc;
//! use stormwatch::config::Config;
//! use stormwatch::feed::HttpFetcher;
//! use stormwatch::notifications::{ConsoleChannel, Notifier};
//! use stormwatch::tracker::{SystemClock, TrackingCoordinator};
//! use stormwatch::utils::retry::RetryConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let fetcher = Arc::new(HttpFetcher::from_config(&config.http)?);
//!     let notifier = Notifier::new(Arc::new(ConsoleChannel::new()), config.display_timezone()?)
//!         .with_destination("console");
//!
//!     let coordinator =
//!         TrackingCoordinator::from_config(&config, fetcher, Arc::new(notifier), Arc::new(SystemClock));
//!     coordinator.bootstrap(&RetryConfig::default()).await?;
//!     coordinator.run().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod parser;
pub mod tracker;
pub mod utils;

/// Types most callers need
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result, StormwatchErrorTrait};
    pub use crate::feed::{DocumentFetcher, FetchedDocument, HttpFetcher};
    pub use crate::models::{CandidateCyclone, Cyclone, CycloneState, StrengthFilter};
    pub use crate::notifications::{NotificationSink, Notifier};
    pub use crate::tracker::{
        CycloneRegistry, TrackOutcome, TrackingCoordinator, TrackingSnapshot, UntrackOutcome,
    };
}

pub use models::{Cyclone, CycloneState};
