//! Per-cyclone update scheduler
//!
//! Each tracked cyclone runs one [`CycloneScheduler`] loop:
//!
//! ```text
//! Idle ─► Fetching ─┬─ updated ──► post, Waiting(next advisory - now) ─┐
//!            ▲      └─ failed ───► budget - 1, Waiting(retry interval) ─┤
//!            └───────────────────────────────────────────────────────────┘
//!                     budget 0 / disqualified / cancelled ─► Terminated
//! ```
//!
//! Ticks of one scheduler are strictly sequential. Cancellation is only
//! observed while suspended, so an in-flight fetch always completes.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::config::Config;
use crate::feed::DocumentFetcher;
use crate::metrics;
use crate::models::{CycloneState, LatestAdvisory, SchedulerToken, StrengthFilter};
use crate::notifications::Notifier;
use crate::parser::AdvisoryExtractor;
use crate::tracker::registry::CycloneRegistry;
use crate::utils::error::{FetchError, ParseError};

// ============================================================================
// Clock
// ============================================================================

/// Source of "now" for interval computation
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Settings and shared context
// ============================================================================

/// Retry policy and strength filter shared by every scheduler
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub retry_interval: Duration,
    pub retry_budget: u32,
    pub strengths: StrengthFilter,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry_interval: config.retry_interval(),
            retry_budget: config.schedule.retry_budget,
            strengths: config.feed.strength_filter(),
        }
    }
}

/// Collaborators every scheduler needs
#[derive(Clone)]
pub struct SchedulerContext {
    pub registry: CycloneRegistry,
    pub fetcher: Arc<dyn DocumentFetcher>,
    pub notifier: Arc<Notifier>,
    pub clock: Arc<dyn Clock>,
    pub settings: SchedulerSettings,
}

// ============================================================================
// Outcomes
// ============================================================================

/// Why a scheduler loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Retry budget reached zero
    Exhausted,
    /// Advisory title no longer names a tracked strength
    Disqualified,
    /// Cancelled by untrack or shutdown
    Cancelled,
    /// The record left the registry under the scheduler
    Removed,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::Disqualified => "disqualified",
            Self::Cancelled => "cancelled",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the loop does after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Wait(Duration),
    Terminate(Termination),
}

/// Why a tick failed
#[derive(Debug)]
enum TickFailure {
    Fetch(FetchError),
    Extract(ParseError),
    NoAnnouncement,
}

impl fmt::Display for TickFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(e) => write!(f, "{e}"),
            Self::Extract(e) => write!(f, "{e}"),
            Self::NoAnnouncement => write!(f, "no next-advisory announcement"),
        }
    }
}

struct FetchTarget {
    advisory_url: String,
    image_url: String,
    last_modified: Option<String>,
}

struct FreshAdvisory {
    advisory: LatestAdvisory,
    storm_name: Option<String>,
}

fn wake_at(now: DateTime<Utc>, wait: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(wait)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

// ============================================================================
// Scheduler
// ============================================================================

/// Update loop of one tracked cyclone
pub struct CycloneScheduler {
    atcf: String,
    token: SchedulerToken,
    ignore_strength: bool,
    context: SchedulerContext,
    extractor: AdvisoryExtractor,
}

impl CycloneScheduler {
    /// Scheduler for the record owned by `token`
    ///
    /// In `ignore_strength` mode the strength check is skipped and the storm
    /// name follows the advisory title.
    pub fn new(
        atcf: impl Into<String>,
        token: SchedulerToken,
        ignore_strength: bool,
        context: SchedulerContext,
    ) -> Self {
        Self {
            atcf: atcf.into(),
            token,
            ignore_strength,
            context,
            extractor: AdvisoryExtractor::new(),
        }
    }

    pub fn atcf(&self) -> &str {
        &self.atcf
    }

    /// Run ticks until termination, then release the registry record
    ///
    /// The first tick runs immediately. A `true` (or a dropped sender) on
    /// `cancel` ends the loop at the next suspension point.
    pub async fn run(self, mut cancel: watch::Receiver<bool>) -> Termination {
        let mut wait = Duration::ZERO;

        let reason = loop {
            tokio::select! {
                biased;
                _ = cancel.changed() => break Termination::Cancelled,
                _ = tokio::time::sleep(wait) => {}
            }

            match self.tick().await {
                TickOutcome::Wait(next) => wait = next,
                TickOutcome::Terminate(reason) => break reason,
            }
        };

        self.finish(reason).await;
        reason
    }

    /// One fetch/extract/resolve step
    pub async fn tick(&self) -> TickOutcome {
        let started = Instant::now();

        let target = self
            .context
            .registry
            .update(&self.atcf, self.token, |c| {
                c.state = CycloneState::Fetching;
                FetchTarget {
                    advisory_url: c.advisory_url.clone(),
                    image_url: c.image_url.clone(),
                    last_modified: c.last_modified.clone(),
                }
            })
            .await;

        let Some(target) = target else {
            return TickOutcome::Terminate(Termination::Removed);
        };

        let (label, outcome) = match self.refresh(&target).await {
            Ok(fresh) => self.on_updated(&target, fresh).await,
            Err(failure) => ("failed", self.on_failed(&failure).await),
        };

        metrics::record_tick(label, started.elapsed().as_secs_f64());
        outcome
    }

    /// Fetch the advisory document and resolve its first announcement
    async fn refresh(&self, target: &FetchTarget) -> Result<FreshAdvisory, TickFailure> {
        let document = self
            .context
            .fetcher
            .fetch(&target.advisory_url, target.last_modified.as_deref())
            .await
            .map_err(TickFailure::Fetch)?;

        let token = document.last_modified.clone();
        self.context
            .registry
            .update(&self.atcf, self.token, |c| c.last_modified = token)
            .await;

        let result = self
            .extractor
            .extract(&document.body, self.ignore_strength)
            .map_err(TickFailure::Extract)?;

        let next = result.next_advisory().ok_or(TickFailure::NoAnnouncement)?;
        let next_advisory_at = next
            .resolve(self.context.clock.now())
            .map_err(TickFailure::Extract)?;

        Ok(FreshAdvisory {
            advisory: LatestAdvisory {
                title: result.title.clone(),
                message: next.message.clone(),
                next_advisory_at,
            },
            storm_name: result.storm_name.clone(),
        })
    }

    async fn on_updated(
        &self,
        target: &FetchTarget,
        fresh: FreshAdvisory,
    ) -> (&'static str, TickOutcome) {
        let FreshAdvisory {
            advisory,
            storm_name,
        } = fresh;

        let stored = advisory.clone();
        let applied = self
            .context
            .registry
            .update(&self.atcf, self.token, |c| {
                c.advisory = Some(stored);
                if let Some(name) = storm_name {
                    if c.name != name {
                        tracing::info!(atcf = %c.atcf, from = %c.name, to = %name, "Cyclone renamed");
                        c.name = name;
                    }
                }
            })
            .await;
        if applied.is_none() {
            return ("removed", TickOutcome::Terminate(Termination::Removed));
        }

        self.context
            .notifier
            .post_advisory(
                &advisory.title,
                &target.image_url,
                &advisory.message,
                &advisory.next_advisory_at,
            )
            .await;

        if !self.ignore_strength && !self.context.settings.strengths.qualifies_title(&advisory.title) {
            tracing::info!(atcf = %self.atcf, title = %advisory.title, "Cyclone is no longer of interest");
            return ("disqualified", TickOutcome::Terminate(Termination::Disqualified));
        }

        let now = self.context.clock.now();
        let until = advisory.next_advisory_at.with_timezone(&Utc);
        let ahead = (until - now).to_std().ok().filter(|d| !d.is_zero());

        match ahead {
            Some(wait) => {
                let budget = self.context.settings.retry_budget;
                let applied = self
                    .context
                    .registry
                    .update(&self.atcf, self.token, |c| {
                        c.retry_budget = budget;
                        c.state = CycloneState::Waiting { until };
                    })
                    .await;
                if applied.is_none() {
                    return ("removed", TickOutcome::Terminate(Termination::Removed));
                }

                tracing::info!(
                    atcf = %self.atcf,
                    next_advisory = %advisory.next_advisory_at,
                    wait_secs = wait.as_secs(),
                    "Advisory posted"
                );
                ("updated", TickOutcome::Wait(wait))
            }
            None => {
                tracing::error!(
                    atcf = %self.atcf,
                    next_advisory = %advisory.next_advisory_at,
                    now = %now,
                    "Next advisory is not in the future"
                );
                ("stale", self.consume_budget(false).await)
            }
        }
    }

    async fn on_failed(&self, failure: &TickFailure) -> TickOutcome {
        let outcome = self.consume_budget(true).await;

        if let TickOutcome::Wait(wait) = outcome {
            tracing::warn!(
                atcf = %self.atcf,
                error = %failure,
                retry_in_secs = wait.as_secs(),
                "Failed to update cyclone"
            );
        }

        outcome
    }

    /// Count one failed attempt and schedule the retry
    async fn consume_budget(&self, clear_advisory: bool) -> TickOutcome {
        let wait = self.context.settings.retry_interval;
        let until = wake_at(self.context.clock.now(), wait);

        let remaining = self
            .context
            .registry
            .update(&self.atcf, self.token, |c| {
                if clear_advisory {
                    c.advisory = None;
                }
                c.retry_budget = c.retry_budget.saturating_sub(1);
                c.state = CycloneState::Waiting { until };
                c.retry_budget
            })
            .await;

        match remaining {
            None => TickOutcome::Terminate(Termination::Removed),
            Some(0) => TickOutcome::Terminate(Termination::Exhausted),
            Some(budget) => {
                tracing::debug!(atcf = %self.atcf, budget, "Retry budget decremented");
                TickOutcome::Wait(wait)
            }
        }
    }

    async fn finish(&self, reason: Termination) {
        let registry = &self.context.registry;

        registry
            .update(&self.atcf, self.token, |c| c.state = CycloneState::Terminated)
            .await;
        if reason != Termination::Removed {
            registry.remove_if_owned(&self.atcf, self.token).await;
        }

        metrics::record_termination(reason.as_str());
        tracing::info!(atcf = %self.atcf, %reason, "No longer tracking cyclone");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_wake_at() {
        let now = Utc.with_ymd_and_hms(2022, 9, 27, 18, 0, 0).unwrap();
        assert_eq!(
            wake_at(now, Duration::from_secs(60)),
            Utc.with_ymd_and_hms(2022, 9, 27, 18, 1, 0).unwrap()
        );
    }

    #[test]
    fn test_fixed_clock() {
        let now = Utc.with_ymd_and_hms(2022, 9, 27, 18, 0, 0).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(now));
        assert_eq!(clock.now(), now);
        assert!(SystemClock.now() > now);
    }

    #[test]
    fn test_termination_labels() {
        assert_eq!(Termination::Exhausted.to_string(), "exhausted");
        assert_eq!(Termination::Cancelled.as_str(), "cancelled");
    }

    #[test]
    fn test_settings_from_default_config() {
        let settings = SchedulerSettings::from_config(&Config::default());
        assert_eq!(settings.retry_budget, 10);
        assert_eq!(settings.retry_interval, Duration::from_secs(60));
        assert!(settings.strengths.qualifies_title("Hurricane Ian Public Advisory"));
    }
}
