//! Coordinator tests: scans, track/untrack commands, purge, shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use stormwatch::config::Config;
use stormwatch::tracker::{TrackOutcome, TrackerError, TrackingCoordinator, UntrackOutcome};
use stormwatch::utils::retry::RetryConfig;

const IMAGE_BASE: &str = "https://www.nhc.noaa.gov/storm_graphics";

fn no_retry() -> RetryConfig {
    RetryConfig::new(0)
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Basin with `storms` and a valid advisory for each
fn scripted_basin(storms: &[Storm]) -> Arc<ScriptedFetcher> {
    let fetcher = ScriptedFetcher::new();
    fetcher.script(BASIN_URL, [Reply::body(basin_xml(storms, IMAGE_BASE))]);
    for storm in storms {
        fetcher.script(
            &advisory_url(storm.wallet),
            [Reply::body(advisory_with_next(
                &format!("{} {} Public Advisory Number 12", storm.strength, storm.name),
                "500 PM",
                "EDT",
            ))],
        );
    }
    fetcher
}

#[tokio::test]
async fn test_bootstrap_tracks_qualifying_storms() {
    let fetcher = scripted_basin(&[IAN, ELEVEN, JULIA]);
    let sink = RecordingSink::new();
    let coordinator = coordinator(fetcher.clone(), sink.clone());

    let summary = coordinator.bootstrap(&no_retry()).await.unwrap();

    assert_eq!(summary.admitted, vec![IAN.atcf.to_string(), JULIA.atcf.to_string()]);
    assert_eq!(summary.skipped, 1);
    assert!(!summary.nothing_active);
    assert_eq!(coordinator.scheduler_count().await, 2);

    eventually(|| sink.posts().len() == 2).await;
    assert!(sink.texts().iter().any(|t| t.starts_with("**Hurricane Ian Public Advisory")));
    assert_eq!(fetcher.fetch_count(&advisory_url(ELEVEN.wallet)), 0);

    coordinator.shutdown().await;
    assert_eq!(coordinator.scheduler_count().await, 0);
    assert!(coordinator.registry().is_empty().await);
}

#[tokio::test]
async fn test_repeated_scan_does_not_duplicate() {
    let fetcher = scripted_basin(&[IAN]);
    let coordinator = coordinator(fetcher, RecordingSink::new());

    coordinator.bootstrap(&no_retry()).await.unwrap();
    let second = coordinator.scan_once().await.unwrap();

    assert!(second.admitted.is_empty());
    assert_eq!(second.skipped, 1);
    assert_eq!(coordinator.scheduler_count().await, 1);
    assert_eq!(coordinator.registry().len().await, 1);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_empty_basin() {
    let fetcher = scripted_basin(&[]);
    let coordinator = coordinator(fetcher, RecordingSink::new());

    let summary = coordinator.bootstrap(&no_retry()).await.unwrap();

    assert!(summary.nothing_active);
    assert!(summary.admitted.is_empty());
    assert_eq!(coordinator.scheduler_count().await, 0);
}

#[tokio::test]
async fn test_bootstrap_retries_recoverable_failures() {
    let fetcher = scripted_basin(&[IAN]);
    fetcher.script(
        BASIN_URL,
        [
            Reply::ServerError(503),
            Reply::ServerError(502),
            Reply::body(basin_xml(&[IAN], IMAGE_BASE)),
        ],
    );
    let coordinator = coordinator(fetcher.clone(), RecordingSink::new());

    let summary = coordinator
        .bootstrap(&RetryConfig::with_delays(3, 1, 5))
        .await
        .unwrap();

    assert_eq!(summary.admitted, vec![IAN.atcf.to_string()]);
    assert_eq!(fetcher.fetch_count(BASIN_URL), 3);
    assert_eq!(coordinator.registry().snapshot().await.scan_cycles, 1);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_bootstrap_gives_up_on_missing_feed() {
    let fetcher = ScriptedFetcher::new();
    let coordinator = coordinator(fetcher.clone(), RecordingSink::new());

    let err = coordinator
        .bootstrap(&RetryConfig::with_delays(3, 1, 5))
        .await
        .unwrap_err();

    assert!(matches!(err, TrackerError::FeedUnavailable { .. }));
    assert_eq!(fetcher.fetch_count(BASIN_URL), 1);
}

#[tokio::test]
async fn test_track_by_name_bypasses_strength_filter() {
    let fetcher = scripted_basin(&[IAN, ELEVEN]);
    let sink = RecordingSink::new();
    let coordinator = coordinator(fetcher, sink.clone());

    let outcome = coordinator.track_by_name("Eleven").await.unwrap();

    assert_eq!(
        outcome,
        TrackOutcome::Tracked {
            atcf: ELEVEN.atcf.to_string(),
            name: "eleven".to_string(),
        }
    );
    assert!(!coordinator.registry().is_tracked(IAN.atcf).await);
    assert!(coordinator.registry().get(ELEVEN.atcf).await.unwrap().ignore_strength);

    eventually(|| sink.posts().len() == 1).await;

    assert_eq!(
        coordinator.track_by_name("ELEVEN").await.unwrap(),
        TrackOutcome::AlreadyTracked {
            name: "eleven".to_string()
        }
    );
    assert_eq!(coordinator.scheduler_count().await, 1);

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_track_unknown_name() {
    let fetcher = scripted_basin(&[IAN]);
    let coordinator = coordinator(fetcher, RecordingSink::new());

    assert_eq!(
        coordinator.track_by_name("zeta").await.unwrap(),
        TrackOutcome::NotFound {
            name: "zeta".to_string()
        }
    );
    assert!(coordinator.registry().is_empty().await);
}

#[tokio::test]
async fn test_track_with_feed_down() {
    let fetcher = ScriptedFetcher::new();
    fetcher.script(BASIN_URL, [Reply::ServerError(503)]);
    let coordinator = coordinator(fetcher, RecordingSink::new());

    let err = coordinator.track_by_name("ian").await.unwrap_err();

    assert!(matches!(err, TrackerError::FeedUnavailable { .. }));
}

#[tokio::test]
async fn test_untrack_blacklists_and_stops_scheduler() {
    let fetcher = scripted_basin(&[IAN]);
    let coordinator = coordinator(fetcher, RecordingSink::new());
    coordinator.bootstrap(&no_retry()).await.unwrap();

    let outcome = coordinator.untrack_by_name("Ian").await;

    assert_eq!(
        outcome,
        UntrackOutcome::Untracked {
            atcf: IAN.atcf.to_string(),
            name: "ian".to_string(),
        }
    );
    assert_eq!(coordinator.scheduler_count().await, 0);
    assert!(coordinator.registry().is_blacklisted(IAN.atcf).await);

    let rescan = coordinator.scan_once().await.unwrap();
    assert!(rescan.admitted.is_empty());

    assert_eq!(
        coordinator.track_by_name("ian").await.unwrap(),
        TrackOutcome::NotFound {
            name: "ian".to_string()
        }
    );
    assert_eq!(
        coordinator.untrack_by_name("ian").await,
        UntrackOutcome::NotFound {
            name: "ian".to_string()
        }
    );
}

#[tokio::test]
async fn test_debug_snapshot() {
    let fetcher = scripted_basin(&[IAN, JULIA]);
    let coordinator = coordinator(fetcher, RecordingSink::new());
    coordinator.bootstrap(&no_retry()).await.unwrap();
    coordinator.untrack_by_name("julia").await;

    let snapshot = coordinator.debug_snapshot().await;

    assert_eq!(snapshot.tracked.len(), 1);
    assert_eq!(snapshot.tracked[0].atcf, IAN.atcf);
    assert_eq!(snapshot.blacklist, vec![JULIA.atcf.to_string()]);

    let text = snapshot.to_string();
    assert!(text.starts_with("Cyclones: [AL092022 (Hurricane Ian"));
    assert!(text.ends_with("Blacklist: [AL132022]"));

    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_set_destination_redirects_posts() {
    let fetcher = scripted_basin(&[IAN]);
    let sink = RecordingSink::new();
    let coordinator = coordinator(fetcher, sink.clone());

    coordinator.set_destination("1021234567");
    coordinator.bootstrap(&no_retry()).await.unwrap();
    eventually(|| !sink.posts().is_empty()).await;

    assert_eq!(sink.posts()[0].0, "1021234567");
    coordinator.shutdown().await;
}

#[tokio::test]
async fn test_commands_rejected_after_shutdown() {
    let fetcher = scripted_basin(&[IAN]);
    let coordinator = coordinator(fetcher, RecordingSink::new());

    coordinator.shutdown().await;

    assert!(matches!(
        coordinator.scan_once().await,
        Err(TrackerError::ShuttingDown)
    ));
    assert!(matches!(
        coordinator.track_by_name("ian").await,
        Err(TrackerError::ShuttingDown)
    ));
    assert!(coordinator.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_blacklist_purge_allows_readmission() {
    let mut config = Config::default();
    config.schedule.blacklist_purge_cycles = 1;
    config.schedule.scan_interval_secs = 600;

    let fetcher = scripted_basin(&[IAN]);
    let coordinator = Arc::new(TrackingCoordinator::from_config(
        &config,
        fetcher.clone(),
        notifier(RecordingSink::new()),
        Arc::new(FixedClock(reference_instant())),
    ));

    coordinator.bootstrap(&no_retry()).await.unwrap();
    coordinator.untrack_by_name("ian").await;
    assert!(coordinator.registry().is_blacklisted(IAN.atcf).await);

    let scan_loop = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.run().await })
    };

    tokio::time::sleep(Duration::from_secs(601)).await;

    assert!(!coordinator.registry().is_blacklisted(IAN.atcf).await);
    assert!(coordinator.registry().is_tracked(IAN.atcf).await);
    assert_eq!(fetcher.fetch_count(BASIN_URL), 2);

    coordinator.shutdown().await;
    scan_loop.await.unwrap();
}

#[tokio::test]
async fn test_scan_in_flight_at_shutdown_starts_nothing() {
    let fetcher = scripted_basin(&[IAN]);
    let gate = fetcher.hold_validation();
    let coordinator = Arc::new(coordinator(fetcher, RecordingSink::new()));

    let scan = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.scan_once().await })
    };

    gate.entered.notified().await;
    coordinator.shutdown().await;
    gate.release.notify_one();

    assert!(matches!(scan.await.unwrap(), Err(TrackerError::ShuttingDown)));
    assert_eq!(coordinator.scheduler_count().await, 0);
    assert!(coordinator.registry().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_scheduler_releases_its_handle() {
    let fetcher = scripted_basin(&[IAN]);
    fetcher.script(&advisory_url(IAN.wallet), [Reply::ServerError(503)]);
    let coordinator = coordinator(fetcher.clone(), RecordingSink::new());

    coordinator.bootstrap(&no_retry()).await.unwrap();
    assert_eq!(coordinator.scheduler_count().await, 1);

    // ten failed ticks, 60s apart
    tokio::time::sleep(Duration::from_secs(11 * 60)).await;

    assert_eq!(fetcher.fetch_count(&advisory_url(IAN.wallet)), 10);
    assert_eq!(coordinator.scheduler_count().await, 0);
    assert!(!coordinator.registry().is_tracked(IAN.atcf).await);
    assert!(!coordinator.registry().is_blacklisted(IAN.atcf).await);
}

#[tokio::test]
async fn test_disqualified_scheduler_releases_its_handle() {
    let fetcher = scripted_basin(&[IAN]);
    fetcher.script(
        &advisory_url(IAN.wallet),
        [Reply::body(advisory_with_next(
            "Post-Tropical Cyclone Ian Public Advisory Number 33",
            "500 PM",
            "EDT",
        ))],
    );
    let coordinator = coordinator(fetcher, RecordingSink::new());

    coordinator.bootstrap(&no_retry()).await.unwrap();

    for _ in 0..200 {
        if coordinator.scheduler_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(coordinator.scheduler_count().await, 0);
    assert!(!coordinator.registry().is_tracked(IAN.atcf).await);
}
