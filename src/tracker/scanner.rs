//! Basin feed scanning and candidate admission rules
//!
//! A scan fetches the basin feed once and runs every `nhc:Cyclone` entry
//! through the admission rules in order. A rejected entry is logged and
//! skipped; it never aborts the scan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::config::FeedConfig;
use crate::feed::DocumentFetcher;
use crate::models::{CandidateCyclone, StrengthFilter};
use crate::parser::{extract_image_link, BasinFeed, CycloneEntry};
use crate::tracker::error::{TrackerError, TrackerResult};
use crate::tracker::registry::{CycloneRegistry, Rejection};

/// Which entries a scan should consider
#[derive(Debug, Clone, Default)]
pub struct ScanRequest {
    /// Admitted storm types; empty admits every type
    pub strengths: StrengthFilter,
    /// Only consider the storm with this lowercase name
    pub name_filter: Option<String>,
}

impl ScanRequest {
    /// Periodic scan with the configured strength filter
    pub fn automatic(strengths: StrengthFilter) -> Self {
        Self {
            strengths,
            name_filter: None,
        }
    }

    /// Name-targeted lookup; the strength filter does not apply
    pub fn by_name(name: &str) -> Self {
        Self {
            strengths: StrengthFilter::any(),
            name_filter: Some(name.trim().to_lowercase()),
        }
    }
}

/// Reason an entry was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingIdentifier,
    Excluded(Rejection),
    MissingName,
    NameMismatch,
    MissingType,
    StrengthTooLow(String),
    MissingWallet,
    InvalidAdvisoryEndpoint(String),
    GraphicNotFound,
    InvalidGraphic(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentifier => write!(f, "atcf not found"),
            Self::Excluded(rejection) => write!(f, "{rejection}"),
            Self::MissingName => write!(f, "name not found"),
            Self::NameMismatch => write!(f, "name does not match"),
            Self::MissingType => write!(f, "type not found"),
            Self::StrengthTooLow(strength) => write!(f, "strength too low ({strength})"),
            Self::MissingWallet => write!(f, "wallet id not found"),
            Self::InvalidAdvisoryEndpoint(url) => write!(f, "advisory URL {url} is invalid"),
            Self::GraphicNotFound => write!(f, "graphic not found"),
            Self::InvalidGraphic(url) => write!(f, "image URL {url} is invalid"),
        }
    }
}

impl SkipReason {
    /// Dedup and filter skips are routine; the rest point at feed problems
    fn is_routine(&self) -> bool {
        matches!(
            self,
            Self::Excluded(_) | Self::NameMismatch | Self::StrengthTooLow(_)
        )
    }
}

/// One skipped entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub atcf: Option<String>,
    pub reason: SkipReason,
}

/// Result of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Entries that passed every rule, in feed order
    pub candidates: Vec<CandidateCyclone>,
    pub skipped: Vec<SkippedEntry>,
    /// The feed listed no cyclones at all
    pub nothing_active: bool,
}

/// Scans a basin feed for trackable cyclones
pub struct BasinScanner {
    fetcher: Arc<dyn DocumentFetcher>,
    feed: FeedConfig,
}

impl BasinScanner {
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, feed: FeedConfig) -> Self {
        Self { fetcher, feed }
    }

    pub fn basin_url(&self) -> &str {
        &self.feed.basin_url
    }

    /// Fetch the basin feed and return the entries that pass admission
    ///
    /// Candidates are not inserted into the registry here; the caller admits
    /// them together with their scheduler ownership token.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::FeedUnavailable` / `FeedMalformed` when the
    /// feed itself cannot be fetched or parsed.
    pub async fn scan(
        &self,
        registry: &CycloneRegistry,
        request: &ScanRequest,
    ) -> TrackerResult<ScanReport> {
        let url = self.basin_url();

        let document = self
            .fetcher
            .fetch(url, None)
            .await
            .map_err(|e| TrackerError::feed_unavailable(url, e))?;

        let feed =
            BasinFeed::parse(&document.body).map_err(|e| TrackerError::feed_malformed(url, e))?;

        let mut report = ScanReport::default();

        if feed.is_empty() {
            tracing::info!(url = %url, "There are no tropical cyclones in the basin at this time");
            report.nothing_active = true;
            return Ok(report);
        }

        for entry in &feed.cyclones {
            match self.evaluate(&feed, entry, registry, request).await {
                Ok(candidate) => {
                    tracing::info!(atcf = %candidate.atcf, name = %candidate.name, "Cyclone passed admission");
                    report.candidates.push(candidate);
                }
                Err(reason) => {
                    let atcf = entry.atcf.clone();
                    if reason.is_routine() {
                        tracing::info!(atcf = ?atcf, %reason, "Skipping cyclone");
                    } else {
                        tracing::warn!(atcf = ?atcf, %reason, "Skipping cyclone");
                    }
                    report.skipped.push(SkippedEntry { atcf, reason });
                }
            }
        }

        Ok(report)
    }

    /// Run one entry through the admission rules
    async fn evaluate(
        &self,
        feed: &BasinFeed,
        entry: &CycloneEntry,
        registry: &CycloneRegistry,
        request: &ScanRequest,
    ) -> Result<CandidateCyclone, SkipReason> {
        let atcf = entry.atcf.clone().ok_or(SkipReason::MissingIdentifier)?;

        if let Some(rejection) = registry.exclusion(&atcf).await {
            return Err(SkipReason::Excluded(rejection));
        }

        let display_name = entry.name.as_deref().ok_or(SkipReason::MissingName)?;
        let name = display_name.to_lowercase();
        if request.name_filter.as_ref().is_some_and(|wanted| *wanted != name) {
            return Err(SkipReason::NameMismatch);
        }

        let strength = entry.strength.clone().ok_or(SkipReason::MissingType)?;
        if !request.strengths.admits_type(&strength) {
            return Err(SkipReason::StrengthTooLow(strength));
        }

        let wallet = entry.wallet.as_deref().ok_or(SkipReason::MissingWallet)?;
        let advisory_url = self.feed.advisory_url(wallet);
        if let Err(e) = self.fetcher.validate(&advisory_url).await {
            tracing::debug!(atcf = %atcf, error = %e, "Advisory endpoint validation failed");
            return Err(SkipReason::InvalidAdvisoryEndpoint(advisory_url));
        }

        let item = feed
            .find_graphics_item(&strength, &name)
            .ok_or(SkipReason::GraphicNotFound)?;
        let image_url = extract_image_link(&item.description).ok_or(SkipReason::GraphicNotFound)?;
        if let Err(e) = self.fetcher.validate(&image_url).await {
            tracing::debug!(atcf = %atcf, error = %e, "Image validation failed");
            return Err(SkipReason::InvalidGraphic(image_url));
        }

        Ok(CandidateCyclone {
            atcf,
            name,
            strength,
            advisory_url,
            image_url,
        })
    }
}
