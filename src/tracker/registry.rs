//! Registry of tracked and blacklisted cyclones
//!
//! Every insertion, removal and field update happens under one write lock,
//! so scans, scheduler ticks and commands never observe a half-applied
//! change. The blacklist is a plain identifier set cleared wholesale after a
//! number of scan cycles.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::models::{Cyclone, CycloneSummary, SchedulerToken};

// ============================================================================
// Admission
// ============================================================================

/// Why a cyclone was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    AlreadyTracked,
    Blacklisted,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyTracked => write!(f, "already tracked"),
            Self::Blacklisted => write!(f, "blacklisted"),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Default)]
struct RegistryState {
    cyclones: HashMap<String, Cyclone>,
    /// Discovery order of `cyclones` keys
    order: Vec<String>,
    blacklist: BTreeSet<String>,
    scan_cycles: u32,
}

impl RegistryState {
    fn exclusion(&self, atcf: &str) -> Option<Rejection> {
        if self.cyclones.contains_key(atcf) {
            Some(Rejection::AlreadyTracked)
        } else if self.blacklist.contains(atcf) {
            Some(Rejection::Blacklisted)
        } else {
            None
        }
    }

    fn remove(&mut self, atcf: &str) -> Option<Cyclone> {
        let cyclone = self.cyclones.remove(atcf)?;
        self.order.retain(|id| id != atcf);
        Some(cyclone)
    }

    fn publish_metrics(&self) {
        crate::metrics::update_registry_metrics(self.cyclones.len(), self.blacklist.len());
    }
}

/// Point-in-time view of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Tracked cyclones in discovery order
    pub tracked: Vec<CycloneSummary>,
    pub blacklist: Vec<String>,
    pub scan_cycles: u32,
}

/// Shared registry of tracked cyclones and blacklisted identifiers
#[derive(Debug, Clone)]
pub struct CycloneRegistry {
    state: Arc<RwLock<RegistryState>>,
    purge_threshold: u32,
}

impl CycloneRegistry {
    /// Create a registry whose blacklist is cleared once the scan counter
    /// exceeds `purge_threshold`
    pub fn new(purge_threshold: u32) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState::default())),
            purge_threshold,
        }
    }

    /// Insert a cyclone unless its identifier is tracked or blacklisted
    pub async fn admit(&self, cyclone: Cyclone) -> Result<(), Rejection> {
        let mut state = self.state.write().await;

        if let Some(rejection) = state.exclusion(&cyclone.atcf) {
            return Err(rejection);
        }

        tracing::info!(atcf = %cyclone.atcf, name = %cyclone.name, "Cyclone admitted");
        state.order.push(cyclone.atcf.clone());
        state.cyclones.insert(cyclone.atcf.clone(), cyclone);
        state.publish_metrics();

        Ok(())
    }

    /// Dedup/blacklist gate used by scans before any network validation
    pub async fn exclusion(&self, atcf: &str) -> Option<Rejection> {
        self.state.read().await.exclusion(atcf)
    }

    pub async fn is_tracked(&self, atcf: &str) -> bool {
        self.state.read().await.cyclones.contains_key(atcf)
    }

    pub async fn is_blacklisted(&self, atcf: &str) -> bool {
        self.state.read().await.blacklist.contains(atcf)
    }

    pub async fn get(&self, atcf: &str) -> Option<Cyclone> {
        self.state.read().await.cyclones.get(atcf).cloned()
    }

    /// First tracked cyclone (discovery order) with the given lowercase name
    pub async fn find_by_name(&self, name: &str) -> Option<Cyclone> {
        let name = name.to_lowercase();
        let state = self.state.read().await;
        state
            .order
            .iter()
            .filter_map(|atcf| state.cyclones.get(atcf))
            .find(|c| c.name == name)
            .cloned()
    }

    /// Apply `f` to the record, but only for the scheduler that owns it
    ///
    /// Returns `None` when the record is gone or owned by another scheduler.
    pub async fn update<R>(
        &self,
        atcf: &str,
        token: SchedulerToken,
        f: impl FnOnce(&mut Cyclone) -> R,
    ) -> Option<R> {
        let mut state = self.state.write().await;
        state
            .cyclones
            .get_mut(atcf)
            .filter(|c| c.scheduler == Some(token))
            .map(f)
    }

    /// Remove the record if `token` still owns it
    pub async fn remove_if_owned(&self, atcf: &str, token: SchedulerToken) -> Option<Cyclone> {
        let mut state = self.state.write().await;

        let owned = state
            .cyclones
            .get(atcf)
            .is_some_and(|c| c.scheduler == Some(token));
        if !owned {
            return None;
        }

        let removed = state.remove(atcf);
        state.publish_metrics();
        removed
    }

    /// Remove a tracked cyclone and blacklist its identifier in one step
    pub async fn untrack(&self, atcf: &str) -> Option<Cyclone> {
        let mut state = self.state.write().await;

        let removed = state.remove(atcf)?;
        state.blacklist.insert(atcf.to_string());
        state.publish_metrics();

        Some(removed)
    }

    /// Count one basin scan; clears the blacklist once the counter exceeds
    /// the threshold and returns whether it did
    pub async fn record_scan_cycle(&self) -> bool {
        let mut state = self.state.write().await;

        state.scan_cycles += 1;
        if state.scan_cycles <= self.purge_threshold {
            return false;
        }

        let purged = state.blacklist.len();
        state.blacklist.clear();
        state.scan_cycles = 0;
        state.publish_metrics();

        tracing::info!(purged, "Blacklist purged");
        true
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.cyclones.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.cyclones.is_empty()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        let state = self.state.read().await;

        RegistrySnapshot {
            tracked: state
                .order
                .iter()
                .filter_map(|atcf| state.cyclones.get(atcf))
                .map(Cyclone::summary)
                .collect(),
            blacklist: state.blacklist.iter().cloned().collect(),
            scan_cycles: state.scan_cycles,
        }
    }
}
