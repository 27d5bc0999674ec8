//! Cyclone tracking engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐     ┌─────────────────┐
//! │  TrackingCoordinator         │────►│  BasinScanner   │── basin feed
//! │  - scan loop (6h)            │     └─────────────────┘
//! │  - handle map atcf -> task   │             │ candidates
//! │  - track / untrack           │             ▼
//! └──────────────────────────────┘     ┌─────────────────┐
//!         │ spawns one per cyclone     │ CycloneRegistry │
//!         ▼                            └─────────────────┘
//! ┌──────────────────────────────┐             ▲
//! │  CycloneScheduler            │─────────────┘ owned updates
//! │  fetch → extract → resolve   │── advisory feed
//! │  → post → sleep / retry      │── Notifier
//! └──────────────────────────────┘
//! ```

pub mod coordinator;
pub mod error;
pub mod registry;
pub mod scanner;
pub mod scheduler;

pub use coordinator::{ScanSummary, TrackOutcome, TrackingCoordinator, TrackingSnapshot, UntrackOutcome};
pub use error::{TrackerError, TrackerResult};
pub use registry::{CycloneRegistry, RegistrySnapshot, Rejection};
pub use scanner::{BasinScanner, ScanReport, ScanRequest, SkipReason, SkippedEntry};
pub use scheduler::{
    Clock, CycloneScheduler, SchedulerContext, SchedulerSettings, SystemClock, Termination,
    TickOutcome,
};
