// Core data structures for stormwatch

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Consecutive failed updates tolerated before a cyclone is dropped
pub const DEFAULT_RETRY_BUDGET: u32 = 10;

/// Lifecycle state of a tracked cyclone's update loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CycloneState {
    /// Admitted, loop not yet started
    Idle,
    /// Suspended until the given instant
    Waiting { until: DateTime<Utc> },
    /// Advisory fetch in flight
    Fetching,
    /// Loop finished; the record is about to leave the registry
    Terminated,
}

impl CycloneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Waiting { .. } => "waiting",
            Self::Fetching => "fetching",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for CycloneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting { until } => write!(f, "waiting until {}", until.format("%Y-%m-%d %H:%M UTC")),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Ownership token of the update loop running for a cyclone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchedulerToken(pub u64);

impl fmt::Display for SchedulerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A feed entry that passed every admission rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateCyclone {
    pub atcf: String,
    /// Lowercase storm name
    pub name: String,
    /// Feed `type`, e.g. "Hurricane"
    pub strength: String,
    pub advisory_url: String,
    pub image_url: String,
}

/// Fields of the last successfully extracted advisory
///
/// Kept together so that title, message and next time are either all known
/// or all unknown.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestAdvisory {
    pub title: String,
    pub message: String,
    pub next_advisory_at: DateTime<Tz>,
}

/// A tracked tropical cyclone
#[derive(Debug, Clone)]
pub struct Cyclone {
    /// Stable storm identifier, e.g. "AL092022"
    pub atcf: String,
    /// Lowercase storm name; may change for storms first tracked unnamed
    pub name: String,
    pub strength: String,
    pub advisory_url: String,
    pub image_url: String,
    /// Conditional-fetch token from the last successful fetch
    pub last_modified: Option<String>,
    /// `None` until the first successful update and after every failed one,
    /// except a tick whose next advisory time has already passed: it counts
    /// as failed but keeps the advisory it just read
    pub advisory: Option<LatestAdvisory>,
    pub retry_budget: u32,
    pub state: CycloneState,
    /// Token of the update loop that owns this record
    pub scheduler: Option<SchedulerToken>,
    /// Tracked by hand: strength no longer disqualifies, name may change
    pub ignore_strength: bool,
    pub discovered_at: DateTime<Utc>,
}

impl Cyclone {
    /// Build a fresh record from an admitted candidate
    pub fn from_candidate(candidate: CandidateCyclone, retry_budget: u32, ignore_strength: bool) -> Self {
        Self {
            atcf: candidate.atcf,
            name: candidate.name,
            strength: candidate.strength,
            advisory_url: candidate.advisory_url,
            image_url: candidate.image_url,
            last_modified: None,
            advisory: None,
            retry_budget,
            state: CycloneState::Idle,
            scheduler: None,
            ignore_strength,
            discovered_at: Utc::now(),
        }
    }

    /// Compact view for debug output
    pub fn summary(&self) -> CycloneSummary {
        CycloneSummary {
            atcf: self.atcf.clone(),
            name: self.name.clone(),
            strength: self.strength.clone(),
            state: self.state,
            retry_budget: self.retry_budget,
            next_advisory_at: self
                .advisory
                .as_ref()
                .map(|a| a.next_advisory_at.to_rfc3339()),
        }
    }
}

/// Serializable snapshot of one tracked cyclone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycloneSummary {
    pub atcf: String,
    pub name: String,
    pub strength: String,
    pub state: CycloneState,
    pub retry_budget: u32,
    pub next_advisory_at: Option<String>,
}

impl fmt::Display for CycloneSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} {}, {}, budget {})",
            self.atcf,
            self.strength,
            crate::utils::capitalize(&self.name),
            self.state,
            self.retry_budget
        )
    }
}

/// Storm classifications worth tracking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrengthFilter {
    strengths: Vec<String>,
}

impl StrengthFilter {
    /// Build a filter; entries are compared lowercase
    pub fn new<I, S>(strengths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            strengths: strengths
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// A filter that admits everything
    pub fn any() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty()
    }

    /// Feed `type` admission: exact (case-insensitive) membership
    pub fn admits_type(&self, strength: &str) -> bool {
        self.is_empty() || self.strengths.iter().any(|s| *s == strength.trim().to_lowercase())
    }

    /// Advisory title check: contains any allowed keyword
    pub fn qualifies_title(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.is_empty() || self.strengths.iter().any(|s| title.contains(s.as_str()))
    }
}
