//! Integration tests for the update coordinator
//!
//! Driven by a counting mock data source so the dedup, staleness and
//! failure-escalation contracts can be asserted without a network.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use pollenradar::models::FORECAST_DAYS;
use pollenradar::{
    CoordinatorConfig, ForecastSet, Location, LocationQuery, PollenCoordinator, PollenDataSource,
    PollenError, PollenForecast, PollenReading, PollenType, Region, SeverityLevel, Snapshot,
    SnapshotState,
};

#[derive(Clone, Copy)]
enum MockBehavior {
    Succeed,
    FailNetwork,
    FailFormat,
}

struct MockSource {
    calls: AtomicUsize,
    delay: Duration,
    behavior: Mutex<MockBehavior>,
}

impl MockSource {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            behavior: Mutex::new(MockBehavior::Succeed),
        })
    }

    fn set(&self, behavior: MockBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PollenDataSource for MockSource {
    async fn fetch(&self, _location: &Location) -> pollenradar::Result<Snapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match *self.behavior.lock().unwrap() {
            MockBehavior::Succeed => Ok(sample_snapshot()),
            MockBehavior::FailNetwork => Err(PollenError::Network("connection refused".into())),
            MockBehavior::FailFormat => {
                Err(PollenError::UpstreamFormat("unexpected token '<'".into()))
            }
        }
    }
}

fn sample_set(pollen_type: PollenType, today_count: f64) -> ForecastSet {
    let today = Utc::now().date_naive();
    let readings = (0..FORECAST_DAYS as i64)
        .map(|offset| PollenReading {
            date: today + chrono::Duration::days(offset),
            count: Some(if offset == 0 { today_count } else { 1.0 }),
            level: SeverityLevel::Low,
            unit: "ppm".to_string(),
            details: Vec::new(),
        })
        .collect();
    ForecastSet::new(pollen_type, readings, today).unwrap()
}

fn sample_snapshot() -> Snapshot {
    Snapshot::new(
        PollenForecast {
            tree: sample_set(PollenType::Tree, 12.0),
            grass: sample_set(PollenType::Grass, 0.0),
            weed: sample_set(PollenType::Weed, 3.0),
        },
        r#"{"forecast":[]}"#.to_string(),
    )
}

fn utrecht() -> Location {
    Location::new(
        Region::Nl,
        "Utrecht",
        LocationQuery::Coordinates {
            latitude: 52.09,
            longitude: 5.12,
        },
    )
    .unwrap()
}

fn coordinator(source: Arc<MockSource>) -> PollenCoordinator {
    PollenCoordinator::new(source, utrecht(), CoordinatorConfig::default())
}

/// Refreshes requested while one is in flight coalesce into a single
/// upstream call.
#[tokio::test]
async fn test_concurrent_refreshes_issue_one_upstream_call() {
    let source = MockSource::with_delay(Duration::from_millis(150));
    let coordinator = coordinator(Arc::clone(&source));

    tokio::join!(
        coordinator.refresh(),
        coordinator.refresh(),
        coordinator.refresh()
    );

    assert_eq!(source.calls(), 1);
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Fresh(_)
    ));

    // A refresh requested after the in-flight one completed does call out.
    coordinator.refresh().await;
    assert_eq!(source.calls(), 2);
}

/// A failed refresh never discards the last good snapshot; it is served as
/// stale with the failure surfaced through diagnostics.
#[tokio::test]
async fn test_failure_preserves_last_good_snapshot() {
    let source = MockSource::new();
    let coordinator = coordinator(Arc::clone(&source));

    coordinator.refresh().await;
    let fresh = match coordinator.get_snapshot() {
        SnapshotState::Fresh(snapshot) => snapshot,
        other => panic!("expected fresh snapshot, got {other:?}"),
    };
    let first_update = coordinator.last_updated().unwrap();

    source.set(MockBehavior::FailFormat);
    coordinator.refresh().await;

    match coordinator.get_snapshot() {
        SnapshotState::Stale {
            snapshot,
            unavailable_since,
        } => {
            assert_eq!(snapshot.forecast, fresh.forecast);
            assert!(unavailable_since >= first_update);
        }
        other => panic!("expected stale snapshot, got {other:?}"),
    }

    // The success timestamp is untouched by the failure.
    assert_eq!(coordinator.last_updated(), Some(first_update));

    let diagnostics = coordinator.diagnostics();
    assert_eq!(diagnostics.consecutive_failures, 1);
    assert!(diagnostics.last_error.unwrap().contains("unexpected"));
    // Raw payload of the last good fetch stays available for debugging.
    assert_eq!(diagnostics.raw_payload.as_deref(), Some(r#"{"forecast":[]}"#));
}

/// Before any success there is nothing to serve, stale or otherwise.
#[tokio::test]
async fn test_unavailable_until_first_success() {
    let source = MockSource::new();
    source.set(MockBehavior::FailNetwork);
    let coordinator = coordinator(Arc::clone(&source));

    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Unavailable
    ));
    assert_eq!(coordinator.last_updated(), None);

    coordinator.refresh().await;
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Unavailable
    ));
    assert!(coordinator.diagnostics().last_error.is_some());

    source.set(MockBehavior::Succeed);
    coordinator.refresh().await;
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Fresh(_)
    ));
}

/// Crossing the consecutive-failure threshold marks the coordinator
/// degraded; a single success clears it.
#[tokio::test]
async fn test_degraded_after_failure_threshold() {
    let source = MockSource::new();
    let config = CoordinatorConfig {
        failure_threshold: 2,
        ..CoordinatorConfig::default()
    };
    let coordinator = PollenCoordinator::new(source.clone(), utrecht(), config);

    coordinator.refresh().await;
    source.set(MockBehavior::FailNetwork);

    coordinator.refresh().await;
    assert!(!coordinator.diagnostics().degraded);

    coordinator.refresh().await;
    let diagnostics = coordinator.diagnostics();
    assert!(diagnostics.degraded);
    assert_eq!(diagnostics.consecutive_failures, 2);
    // Still serving the old snapshot, not erroring consumers out.
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Stale { .. }
    ));

    source.set(MockBehavior::Succeed);
    coordinator.refresh().await;
    assert!(!coordinator.diagnostics().degraded);
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Fresh(_)
    ));
}

/// Fire-and-forget refresh requests issued while one is already in flight
/// coalesce into that single upstream call.
#[tokio::test]
async fn test_requests_during_inflight_refresh_coalesce() {
    let source = MockSource::with_delay(Duration::from_millis(150));
    let coordinator = coordinator(Arc::clone(&source));

    coordinator.request_refresh();
    // Let the first request take the gate before piling on.
    tokio::time::sleep(Duration::from_millis(30)).await;
    coordinator.request_refresh();
    coordinator.request_refresh();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(source.calls(), 1);
    assert!(matches!(
        coordinator.get_snapshot(),
        SnapshotState::Fresh(_)
    ));
}

/// The scheduled task fetches immediately on start, serves manual requests
/// in between, and goes quiet after shutdown.
#[tokio::test]
async fn test_scheduled_task_start_poke_shutdown() {
    let source = MockSource::new();
    let coordinator = coordinator(Arc::clone(&source));

    coordinator.start();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 1, "first tick should fire immediately");
    assert!(coordinator.last_updated().is_some());

    coordinator.request_refresh();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 2, "manual request should fetch");

    coordinator.shutdown();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.calls(), 2, "no scheduled fetches after shutdown");
}
