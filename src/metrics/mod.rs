//! Prometheus metrics for the cyclone tracker
//!
//! Series exported:
//! - Registry: tracked and blacklisted cyclone counts
//! - Scanner: basin scans by outcome, admissions and rejections
//! - Schedulers: update ticks by outcome, terminations, tick duration
//! - Notifications: deliveries by sink and status
//!
//! Nothing is recorded until `init_metrics()` registers the series; every
//! recording helper is a no-op before that or after a failed registration.

use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

struct TrackerMetrics {
    tracked: Gauge,
    blacklisted: Gauge,
    scans: CounterVec,
    scan_entries: CounterVec,
    ticks: CounterVec,
    tick_duration: HistogramVec,
    terminations: CounterVec,
    notifications: CounterVec,
}

static TRACKER_METRICS: OnceLock<TrackerMetrics> = OnceLock::new();

static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Register every tracker series with the default Prometheus registry
///
/// Only the first call does anything.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = TrackerMetrics {
        tracked: register_gauge!(
            "stormwatch_tracked_cyclones",
            "Number of cyclones currently tracked"
        )?,
        blacklisted: register_gauge!(
            "stormwatch_blacklisted_cyclones",
            "Number of cyclone identifiers currently blacklisted"
        )?,
        scans: register_counter_vec!(
            "stormwatch_basin_scans_total",
            "Basin scans by outcome",
            &["outcome"]
        )?,
        scan_entries: register_counter_vec!(
            "stormwatch_scan_entries_total",
            "Feed entries processed by scans, admitted or rejected with reason",
            &["result"]
        )?,
        ticks: register_counter_vec!(
            "stormwatch_scheduler_ticks_total",
            "Scheduler update ticks by outcome",
            &["outcome"]
        )?,
        tick_duration: register_histogram_vec!(
            "stormwatch_scheduler_tick_duration_seconds",
            "Time spent fetching and extracting one advisory",
            &["outcome"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        terminations: register_counter_vec!(
            "stormwatch_scheduler_terminations_total",
            "Scheduler terminations by reason",
            &["reason"]
        )?,
        notifications: register_counter_vec!(
            "stormwatch_notifications_total",
            "Advisory posts by sink and status",
            &["sink", "status"]
        )?,
    };

    TRACKER_METRICS
        .set(metrics)
        .map_err(|_| "Tracker metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");

    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    TRACKER_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Update registry size gauges
pub fn update_registry_metrics(tracked: usize, blacklisted: usize) {
    if let Some(m) = TRACKER_METRICS.get() {
        m.tracked.set(tracked as f64);
        m.blacklisted.set(blacklisted as f64);
    }
}

/// Record a finished basin scan
pub fn record_scan(outcome: &str, admitted: usize, rejected: usize) {
    let Some(m) = TRACKER_METRICS.get() else {
        return;
    };

    m.scans.with_label_values(&[outcome]).inc();

    if admitted > 0 {
        m.scan_entries
            .with_label_values(&["admitted"])
            .inc_by(admitted as f64);
    }
    if rejected > 0 {
        m.scan_entries
            .with_label_values(&["rejected"])
            .inc_by(rejected as f64);
    }
}

/// Record a scheduler tick
pub fn record_tick(outcome: &str, duration_secs: f64) {
    let Some(m) = TRACKER_METRICS.get() else {
        return;
    };

    m.ticks.with_label_values(&[outcome]).inc();
    m.tick_duration
        .with_label_values(&[outcome])
        .observe(duration_secs);
}

/// Record a scheduler termination
pub fn record_termination(reason: &str) {
    if let Some(m) = TRACKER_METRICS.get() {
        m.terminations.with_label_values(&[reason]).inc();
    }
}

/// Record a notification attempt
pub fn record_notification(sink: &str, delivered: bool) {
    if let Some(m) = TRACKER_METRICS.get() {
        let status = if delivered { "delivered" } else { "failed" };
        m.notifications.with_label_values(&[sink, status]).inc();
    }
}

// ============================================================================
// Tests
// ============================================================================
