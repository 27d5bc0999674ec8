//! Top-level tracking control
//!
//! The coordinator is the only place scheduler tasks are created and torn
//! down. It owns the map from ATCF identifier to running scheduler handle,
//! runs the periodic basin scan and serves the track/untrack commands.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::feed::DocumentFetcher;
use crate::metrics;
use crate::models::{CandidateCyclone, Cyclone, CycloneSummary, SchedulerToken};
use crate::notifications::Notifier;
use crate::tracker::error::{TrackerError, TrackerResult};
use crate::tracker::registry::{CycloneRegistry, Rejection};
use crate::tracker::scanner::{BasinScanner, ScanRequest};
use crate::tracker::scheduler::{
    Clock, CycloneScheduler, SchedulerContext, SchedulerSettings, Termination,
};
use crate::utils::capitalize;
use crate::utils::retry::{with_retry_if, RetryConfig};

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a `track <name>` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TrackOutcome {
    Tracked { atcf: String, name: String },
    AlreadyTracked { name: String },
    NotFound { name: String },
}

/// Result of an `untrack <name>` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UntrackOutcome {
    Untracked { atcf: String, name: String },
    NotFound { name: String },
}

/// Result of one periodic scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Identifiers of newly tracked cyclones
    pub admitted: Vec<String>,
    pub skipped: usize,
    pub nothing_active: bool,
}

/// Tracked cyclones and blacklisted identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSnapshot {
    pub tracked: Vec<CycloneSummary>,
    pub blacklist: Vec<String>,
}

impl fmt::Display for TrackingSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tracked: Vec<String> = self.tracked.iter().map(ToString::to_string).collect();
        write!(
            f,
            "Cyclones: [{}]\nBlacklist: [{}]",
            tracked.join(", "),
            self.blacklist.join(", ")
        )
    }
}

// ============================================================================
// Coordinator
// ============================================================================

struct SchedulerHandle {
    token: SchedulerToken,
    cancel: watch::Sender<bool>,
    join: JoinHandle<Termination>,
}

type HandleMap = Arc<Mutex<HashMap<String, SchedulerHandle>>>;

/// Owns the scan loop and every per-cyclone scheduler
pub struct TrackingCoordinator {
    context: SchedulerContext,
    scanner: BasinScanner,
    scan_interval: Duration,
    handles: HandleMap,
    next_token: AtomicU64,
    shutdown: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl TrackingCoordinator {
    pub fn new(context: SchedulerContext, scanner: BasinScanner, scan_interval: Duration) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);

        Self {
            context,
            scanner,
            scan_interval,
            handles: Arc::new(Mutex::new(HashMap::new())),
            next_token: AtomicU64::new(1),
            shutdown,
            shutdown_rx,
        }
    }

    /// Wire a coordinator from configuration and its collaborators
    pub fn from_config(
        config: &Config,
        fetcher: Arc<dyn DocumentFetcher>,
        notifier: Arc<Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let context = SchedulerContext {
            registry: CycloneRegistry::new(config.schedule.blacklist_purge_cycles),
            fetcher: fetcher.clone(),
            notifier,
            clock,
            settings: SchedulerSettings::from_config(config),
        };
        let scanner = BasinScanner::new(fetcher, config.feed.clone());

        Self::new(context, scanner, config.scan_interval())
    }

    pub fn registry(&self) -> &CycloneRegistry {
        &self.context.registry
    }

    pub fn notifier(&self) -> &Notifier {
        &self.context.notifier
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Admit a candidate and start its scheduler
    ///
    /// The handle map stays locked across admission so a scheduler that
    /// finishes immediately cannot look for its handle before it exists.
    /// `shutdown()` drains the map under the same lock, so once it has run
    /// no further scheduler is spawned.
    ///
    /// # Errors
    ///
    /// `TrackerError::ShuttingDown` once shutdown has begun.
    async fn start_tracking(
        &self,
        candidate: CandidateCyclone,
        ignore_strength: bool,
    ) -> TrackerResult<Result<SchedulerToken, Rejection>> {
        let token = SchedulerToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        let atcf = candidate.atcf.clone();

        let mut cyclone =
            Cyclone::from_candidate(candidate, self.context.settings.retry_budget, ignore_strength);
        cyclone.scheduler = Some(token);

        let mut handles = self.handles.lock().await;
        if self.is_shutting_down() {
            return Err(TrackerError::ShuttingDown);
        }
        if let Err(rejection) = self.context.registry.admit(cyclone).await {
            return Ok(Err(rejection));
        }

        let (cancel, cancel_rx) = watch::channel(false);
        let scheduler =
            CycloneScheduler::new(atcf.clone(), token, ignore_strength, self.context.clone());
        let handle_map = self.handles.clone();
        let key = atcf.clone();

        let join = tokio::spawn(async move {
            let reason = scheduler.run(cancel_rx).await;

            let mut handles = handle_map.lock().await;
            if handles.get(&key).is_some_and(|h| h.token == token) {
                handles.remove(&key);
            }
            reason
        });

        tracing::info!(atcf = %atcf, %token, ignore_strength, "Scheduler started");
        handles.insert(
            atcf,
            SchedulerHandle {
                token,
                cancel,
                join,
            },
        );

        Ok(Ok(token))
    }

    /// Scan the basin once and start tracking every admitted cyclone
    ///
    /// A scan still in flight when shutdown begins returns
    /// `TrackerError::ShuttingDown` without starting any scheduler.
    pub async fn scan_once(&self) -> TrackerResult<ScanSummary> {
        if self.is_shutting_down() {
            return Err(TrackerError::ShuttingDown);
        }

        let request = ScanRequest::automatic(self.context.settings.strengths.clone());
        let report = match self.scanner.scan(&self.context.registry, &request).await {
            Ok(report) => report,
            Err(e) => {
                metrics::record_scan("failed", 0, 0);
                return Err(e);
            }
        };

        let mut summary = ScanSummary {
            admitted: Vec::new(),
            skipped: report.skipped.len(),
            nothing_active: report.nothing_active,
        };

        for candidate in report.candidates {
            let atcf = candidate.atcf.clone();
            match self.start_tracking(candidate, false).await? {
                Ok(_) => summary.admitted.push(atcf),
                Err(rejection) => {
                    tracing::info!(atcf = %atcf, %rejection, "Candidate not admitted");
                    summary.skipped += 1;
                }
            }
        }

        let outcome = if summary.nothing_active { "empty" } else { "ok" };
        metrics::record_scan(outcome, summary.admitted.len(), summary.skipped);

        tracing::info!(
            url = %self.scanner.basin_url(),
            admitted = summary.admitted.len(),
            skipped = summary.skipped,
            "Basin updated"
        );

        Ok(summary)
    }

    /// One periodic cycle: advance the blacklist purge counter, then scan
    async fn scan_cycle(&self) -> TrackerResult<ScanSummary> {
        self.context.registry.record_scan_cycle().await;
        self.scan_once().await
    }

    /// First scan at startup, retried while the failure is recoverable
    ///
    /// # Errors
    ///
    /// Returns the last scan error once retries are exhausted; the caller
    /// should treat it as fatal.
    pub async fn bootstrap(&self, retry: &RetryConfig) -> TrackerResult<ScanSummary> {
        self.context.registry.record_scan_cycle().await;
        with_retry_if(retry, || self.scan_once(), TrackerError::is_recoverable).await
    }

    /// Scan every `scan_interval` until shutdown
    ///
    /// The first scan is expected to have run through [`Self::bootstrap`].
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    tracing::info!("Basin scan loop shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.scan_interval) => {
                    if let Err(e) = self.scan_cycle().await {
                        tracing::warn!(error = %e, "Basin scan failed");
                    }
                }
            }
        }
    }

    /// Track a storm by name, bypassing the strength filter
    ///
    /// # Errors
    ///
    /// Returns a `TrackerError` when the basin feed cannot be read or
    /// shutdown has begun.
    pub async fn track_by_name(&self, name: &str) -> TrackerResult<TrackOutcome> {
        if self.is_shutting_down() {
            return Err(TrackerError::ShuttingDown);
        }

        let name = name.trim().to_lowercase();

        if self.context.registry.find_by_name(&name).await.is_some() {
            return Ok(TrackOutcome::AlreadyTracked { name });
        }

        let report = self
            .scanner
            .scan(&self.context.registry, &ScanRequest::by_name(&name))
            .await?;

        for candidate in report.candidates {
            let atcf = candidate.atcf.clone();
            match self.start_tracking(candidate, true).await? {
                Ok(_) => return Ok(TrackOutcome::Tracked { atcf, name }),
                Err(rejection) => {
                    tracing::info!(atcf = %atcf, %rejection, "Requested cyclone not admitted");
                }
            }
        }

        Ok(TrackOutcome::NotFound { name })
    }

    /// Untrack a storm by name: blacklist it and cancel its scheduler
    pub async fn untrack_by_name(&self, name: &str) -> UntrackOutcome {
        let name = name.trim().to_lowercase();

        let Some(cyclone) = self.context.registry.find_by_name(&name).await else {
            return UntrackOutcome::NotFound { name };
        };
        if self.context.registry.untrack(&cyclone.atcf).await.is_none() {
            return UntrackOutcome::NotFound { name };
        }

        let handle = self.handles.lock().await.remove(&cyclone.atcf);
        if let Some(handle) = handle {
            // A send error means the task already finished
            let _ = handle.cancel.send(true);
            if let Err(e) = handle.join.await {
                tracing::warn!(atcf = %cyclone.atcf, error = %e, "Scheduler task failed");
            }
        }

        tracing::info!(atcf = %cyclone.atcf, name = %capitalize(&name), "Cyclone untracked");
        UntrackOutcome::Untracked {
            atcf: cyclone.atcf,
            name,
        }
    }

    /// Send all future posts to `destination`
    pub fn set_destination(&self, destination: impl Into<String>) {
        self.context.notifier.set_destination(destination);
    }

    pub async fn debug_snapshot(&self) -> TrackingSnapshot {
        let snapshot = self.context.registry.snapshot().await;
        TrackingSnapshot {
            tracked: snapshot.tracked,
            blacklist: snapshot.blacklist,
        }
    }

    /// Number of scheduler tasks still registered
    pub async fn scheduler_count(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Stop the scan loop, cancel every scheduler and wait for them
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let handles: Vec<(String, SchedulerHandle)> =
            self.handles.lock().await.drain().collect();

        for (_, handle) in &handles {
            let _ = handle.cancel.send(true);
        }

        let stopping = handles
            .into_iter()
            .map(|(atcf, handle)| async move { (atcf, handle.join.await) });

        for (atcf, result) in futures::future::join_all(stopping).await {
            match result {
                Ok(reason) => tracing::debug!(atcf = %atcf, %reason, "Scheduler stopped"),
                Err(e) => tracing::warn!(atcf = %atcf, error = %e, "Scheduler task failed"),
            }
        }

        tracing::info!("Tracking coordinator stopped");
    }
}
