//! Update coordinator: refresh scheduling, coalescing and failure state
//!
//! One coordinator owns the whole refresh pipeline for a single configured
//! location. Consumers read the cached snapshot synchronously; the network
//! is only ever touched by the coalesced refresh path, and at most one
//! upstream call is in flight per location at any time. A failed refresh
//! never discards the last good snapshot; it flips the state to stale and
//! keeps the schedule running.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::PollenDataSource;
use crate::config::CoordinatorConfig;
use crate::error::PollenError;
use crate::models::location::Location;
use crate::models::snapshot::Snapshot;

/// Cached state as seen by consumers.
#[derive(Debug, Clone)]
pub enum SnapshotState {
    /// The most recent refresh succeeded.
    Fresh(Arc<Snapshot>),
    /// The upstream is failing; the last good snapshot is still served.
    Stale {
        snapshot: Arc<Snapshot>,
        /// When the first refresh after the snapshot started failing.
        unavailable_since: DateTime<Utc>,
    },
    /// No refresh has succeeded yet.
    Unavailable,
}

impl SnapshotState {
    /// The snapshot, fresh or stale.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Self::Fresh(snapshot) | Self::Stale { snapshot, .. } => Some(snapshot),
            Self::Unavailable => None,
        }
    }
}

/// Troubleshooting view over the coordinator state, for surfacing when the
/// upstream changes its interface.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    /// Raw body of the last successful fetch.
    pub raw_payload: Option<String>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub last_updated: Option<DateTime<Utc>>,
    /// Set once the consecutive-failure threshold is crossed.
    pub degraded: bool,
}

#[derive(Default)]
struct SharedState {
    snapshot: Option<Arc<Snapshot>>,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<String>,
    consecutive_failures: u32,
    unavailable_since: Option<DateTime<Utc>>,
    backoff_until: Option<Instant>,
}

struct Inner {
    source: Arc<dyn PollenDataSource>,
    location: Location,
    config: CoordinatorConfig,
    state: RwLock<SharedState>,
    /// Serializes refreshes; waiters coalesce via `generation`.
    refresh_gate: Mutex<()>,
    /// Bumped after every completed refresh attempt.
    generation: AtomicU64,
}

/// Per-location refresh coordinator.
///
/// Created once per configured location and torn down with
/// [`PollenCoordinator::shutdown`] when the location is removed; there is
/// no shared state between coordinators.
pub struct PollenCoordinator {
    inner: Arc<Inner>,
    task: StdMutex<Option<JoinHandle<()>>>,
}

impl PollenCoordinator {
    #[must_use]
    pub fn new(
        source: Arc<dyn PollenDataSource>,
        location: Location,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                location,
                config,
                state: RwLock::new(SharedState::default()),
                refresh_gate: Mutex::new(()),
                generation: AtomicU64::new(0),
            }),
            task: StdMutex::new(None),
        }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.inner.location
    }

    /// Start the periodic refresh task.
    ///
    /// The first tick fires immediately, so starting doubles as the initial
    /// fetch after startup. Missed ticks are delayed, not bursted. Calling
    /// `start` on a running coordinator is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            warn!(location = %self.inner.location.name, "coordinator already started");
            return;
        }
        let inner = Arc::clone(&self.inner);
        info!(
            location = %inner.location.name,
            region = %inner.location.region,
            interval_secs = inner.config.update_interval().as_secs(),
            "starting pollen refresh schedule"
        );
        *task = Some(tokio::spawn(run_loop(inner)));
    }

    /// Cancel the periodic refresh task. Cached state stays readable.
    pub fn shutdown(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
            debug!(location = %self.inner.location.name, "stopped pollen refresh schedule");
        }
    }

    /// Ask for a refresh without waiting for it.
    ///
    /// The result is observed through [`PollenCoordinator::get_snapshot`].
    /// If a refresh is already in flight the request coalesces with it
    /// instead of issuing another upstream call. Must be called from within
    /// a tokio runtime.
    pub fn request_refresh(&self) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.refresh().await;
        });
    }

    /// Run a refresh and wait for it to complete.
    ///
    /// Callers that arrive while another refresh is in flight wait for that
    /// one instead of issuing a second upstream call. Hosts typically await
    /// this once at configuration time to validate connectivity before
    /// calling [`PollenCoordinator::start`].
    pub async fn refresh(&self) {
        self.inner.refresh().await;
    }

    /// Current cached state. Synchronous; never touches the network.
    #[must_use]
    pub fn get_snapshot(&self) -> SnapshotState {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        match &state.snapshot {
            Some(snapshot) if state.consecutive_failures == 0 => {
                SnapshotState::Fresh(Arc::clone(snapshot))
            }
            Some(snapshot) => SnapshotState::Stale {
                snapshot: Arc::clone(snapshot),
                unavailable_since: state.unavailable_since.unwrap_or_else(Utc::now),
            },
            None => SnapshotState::Unavailable,
        }
    }

    /// Timestamp of the last successful refresh.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_updated
    }

    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        let state = self
            .inner
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Diagnostics {
            raw_payload: state
                .snapshot
                .as_ref()
                .map(|snapshot| snapshot.raw_payload.clone()),
            last_error: state.last_error.clone(),
            consecutive_failures: state.consecutive_failures,
            last_updated: state.last_updated,
            degraded: state.consecutive_failures >= self.inner.config.failure_threshold,
        }
    }
}

impl Drop for PollenCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn run_loop(inner: Arc<Inner>) {
    let mut ticker = tokio::time::interval(inner.config.update_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        // The backoff only suppresses scheduled ticks; an explicit
        // request_refresh is an operator decision and goes through.
        if inner.in_backoff() {
            debug!(
                location = %inner.location.name,
                "skipping scheduled refresh during rate-limit backoff"
            );
            continue;
        }
        inner.refresh().await;
    }
}

impl Inner {
    /// Coalescing refresh: exactly one upstream call services every caller
    /// that arrives while it is in flight.
    async fn refresh(&self) {
        let seen = self.generation.load(Ordering::Acquire);
        let _gate = self.refresh_gate.lock().await;
        if self.generation.load(Ordering::Acquire) != seen {
            // A refresh completed while this caller waited at the gate; its
            // result is current enough.
            debug!(location = %self.location.name, "refresh coalesced with in-flight request");
            return;
        }

        let timeout = self.config.request_timeout();
        let result = match tokio::time::timeout(timeout, self.source.fetch(&self.location)).await {
            Ok(result) => result,
            Err(_) => Err(PollenError::Network(format!(
                "request timed out after {}s",
                timeout.as_secs()
            ))),
        };
        self.generation.fetch_add(1, Ordering::AcqRel);

        match result {
            Ok(snapshot) => self.record_success(snapshot),
            Err(err) => self.record_failure(&err),
        }
    }

    fn record_success(&self, snapshot: Snapshot) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let fetched_at = snapshot.fetched_at;
        // Atomic replacement: readers see the old snapshot or the new one,
        // never a mix.
        state.snapshot = Some(Arc::new(snapshot));
        state.last_updated = Some(fetched_at);
        state.last_error = None;
        state.consecutive_failures = 0;
        state.unavailable_since = None;
        state.backoff_until = None;
        info!(location = %self.location.name, "pollen snapshot refreshed");
    }

    fn record_failure(&self, err: &PollenError) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.consecutive_failures += 1;
        state.unavailable_since.get_or_insert_with(Utc::now);
        state.last_error = Some(err.to_string());

        if let PollenError::RateLimited(_) = err {
            let backoff = self.config.rate_limit_backoff();
            state.backoff_until = Some(Instant::now() + backoff);
            warn!(
                location = %self.location.name,
                backoff_secs = backoff.as_secs(),
                "upstream rate-limited us; reducing refresh frequency"
            );
        }

        if state.consecutive_failures == self.config.failure_threshold {
            error!(
                location = %self.location.name,
                failures = state.consecutive_failures,
                %err,
                "pollen refresh keeps failing; coordinator degraded"
            );
        } else {
            warn!(
                location = %self.location.name,
                failures = state.consecutive_failures,
                %err,
                "pollen refresh failed; serving last good snapshot"
            );
        }
    }

    fn in_backoff(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .backoff_until
            .is_some_and(|until| Instant::now() < until)
    }
}
