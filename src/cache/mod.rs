//! Single-snapshot cache in front of the upstream client.
//!
//! At most one upstream fetch runs at a time. The fetch executes in its own
//! task so that dropping a caller never abandons the callers joined to it, and
//! an RAII guard clears the in-flight marker on every exit path, including
//! upstream panics and runtime shutdown.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::{CacheError, UpstreamError};
use crate::fetch::{Credentials, UpstreamClient};
use crate::records::Snapshot;
use crate::utils::{format_timestamp, serialize_optional_secs};

pub mod refresher;

pub use refresher::spawn_refresher;

pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(180);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

type FetchOutcome = Result<Snapshot, UpstreamError>;
type OutcomeReceiver = watch::Receiver<Option<FetchOutcome>>;

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    pub freshness_window: Duration,
    pub fetch_timeout: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Freshness {
    /// Within the freshness window, or produced by the fetch this call waited on.
    Fresh,
    /// Expired, served because another caller's refresh is still in flight.
    Stale,
    /// Expired, served because the refresh attempt failed.
    StaleFallback,
}

/// Snapshot handed to a caller together with how it was obtained.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Snapshot,
    pub freshness: Freshness,
    pub fallback_reason: Option<UpstreamError>,
}

impl CacheRead {
    fn fresh(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            freshness: Freshness::Fresh,
            fallback_reason: None,
        }
    }

    fn stale(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            freshness: Freshness::Stale,
            fallback_reason: None,
        }
    }

    /// Snapshot kept after a failed refresh. It stays `Fresh` while still
    /// inside the freshness window; the failure is reported either way.
    fn fallback(snapshot: Snapshot, reason: UpstreamError, still_fresh: bool) -> Self {
        Self {
            snapshot,
            freshness: if still_fresh {
                Freshness::Fresh
            } else {
                Freshness::StaleFallback
            },
            fallback_reason: Some(reason),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.freshness != Freshness::Fresh
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub has_snapshot: bool,
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(rename = "ageSeconds", serialize_with = "serialize_optional_secs")]
    pub age: Option<Duration>,
    pub is_fresh: bool,
    pub fetch_in_progress: bool,
    pub asset_count: usize,
}

#[derive(Default)]
struct CacheState {
    snapshot: Option<Snapshot>,
    in_flight: Option<OutcomeReceiver>,
}

impl CacheState {
    /// Store `candidate` unless a newer snapshot is already held; returns the one kept.
    fn install(&mut self, candidate: Snapshot) -> Snapshot {
        match &self.snapshot {
            Some(current) if current.fetched_at() > candidate.fetched_at() => {
                debug!(
                    "Keeping snapshot from {} over older fetch from {}",
                    current.fetched_at(),
                    candidate.fetched_at()
                );
                current.clone()
            }
            _ => {
                self.snapshot = Some(candidate.clone());
                candidate
            }
        }
    }
}

struct Inner {
    upstream: Arc<dyn UpstreamClient>,
    credentials: Option<Credentials>,
    settings: CacheSettings,
    state: Mutex<CacheState>,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn fetch_once(&self, credentials: &Credentials, now: DateTime<Utc>) -> FetchOutcome {
        let timeout = self.settings.fetch_timeout;
        match tokio::time::timeout(timeout, self.upstream.fetch_raw(credentials, now)).await {
            Ok(Ok(assets)) => Ok(Snapshot::new(assets, now)),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(UpstreamError::Timeout(timeout)),
        }
    }

    fn finish(&self, tx: watch::Sender<Option<FetchOutcome>>, outcome: FetchOutcome) {
        let published = {
            let mut state = self.lock_state();
            state.in_flight = None;
            outcome.map(|snapshot| state.install(snapshot))
        };

        match &published {
            Ok(snapshot) => info!(
                "Cached {} assets from {} (fetched at {})",
                snapshot.assets().len(),
                self.upstream.name(),
                format_timestamp(snapshot.fetched_at())
            ),
            Err(err) => warn!("Refresh from {} failed: {err}", self.upstream.name()),
        }

        tx.send_replace(Some(published));
    }
}

/// Owns the in-flight marker for one fetch and publishes its outcome exactly once.
struct FetchGuard {
    inner: Arc<Inner>,
    tx: Option<watch::Sender<Option<FetchOutcome>>>,
}

impl FetchGuard {
    fn complete(mut self, outcome: FetchOutcome) {
        if let Some(tx) = self.tx.take() {
            self.inner.finish(tx, outcome);
        }
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            self.inner.finish(tx, Err(UpstreamError::Abandoned));
        }
    }
}

/// Shared handle to the withdraw-fee snapshot. Clones refer to the same cache.
#[derive(Clone)]
pub struct RefreshableCache {
    inner: Arc<Inner>,
}

impl RefreshableCache {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        credentials: Option<Credentials>,
        settings: CacheSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                upstream,
                credentials,
                settings,
                state: Mutex::new(CacheState::default()),
            }),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.inner.settings
    }

    /// Return the current snapshot, refreshing it first when it is missing or expired.
    pub async fn get_data(&self, now: DateTime<Utc>) -> Result<CacheRead, CacheError> {
        let credentials = self.credentials()?;
        let window = self.inner.settings.freshness_window;

        let pending = {
            let mut state = self.inner.lock_state();

            if let Some(snapshot) = &state.snapshot {
                if snapshot.is_fresh(now, window) {
                    return Ok(CacheRead::fresh(snapshot.clone()));
                }
            }

            match state.in_flight.clone() {
                None => self.start_fetch(&mut state, credentials, now),
                Some(rx) => {
                    if let Some(snapshot) = &state.snapshot {
                        debug!("Serving stale snapshot while a refresh is in flight");
                        return Ok(CacheRead::stale(snapshot.clone()));
                    }
                    debug!("Waiting on in-flight cold-start fetch");
                    rx
                }
            }
        };

        self.settle(pending, now).await
    }

    /// Refresh regardless of freshness. Joins a fetch that is already in flight.
    pub async fn force_refresh(&self, now: DateTime<Utc>) -> Result<CacheRead, CacheError> {
        let credentials = self.credentials()?;

        let pending = {
            let mut state = self.inner.lock_state();
            match state.in_flight.clone() {
                Some(rx) => {
                    debug!("Forced refresh joining in-flight fetch");
                    rx
                }
                None => self.start_fetch(&mut state, credentials, now),
            }
        };

        self.settle(pending, now).await
    }

    pub fn cache_status(&self, now: DateTime<Utc>) -> CacheStatus {
        let state = self.inner.lock_state();
        let snapshot = state.snapshot.as_ref();

        CacheStatus {
            has_snapshot: snapshot.is_some(),
            fetched_at: snapshot.map(Snapshot::fetched_at),
            age: snapshot.map(|s| s.age(now)),
            is_fresh: snapshot
                .map(|s| s.is_fresh(now, self.inner.settings.freshness_window))
                .unwrap_or(false),
            fetch_in_progress: state.in_flight.is_some(),
            asset_count: snapshot.map(|s| s.assets().len()).unwrap_or(0),
        }
    }

    fn credentials(&self) -> Result<Credentials, CacheError> {
        self.inner
            .credentials
            .clone()
            .ok_or(CacheError::ConfigurationMissing)
    }

    /// Must be called with the state lock held so the freshness check and the
    /// in-flight marker are set in one critical section.
    fn start_fetch(
        &self,
        state: &mut CacheState,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> OutcomeReceiver {
        let (tx, rx) = watch::channel(None);
        state.in_flight = Some(rx.clone());

        debug!("Starting upstream fetch from {}", self.inner.upstream.name());

        let guard = FetchGuard {
            inner: Arc::clone(&self.inner),
            tx: Some(tx),
        };
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let outcome = inner.fetch_once(&credentials, now).await;
            guard.complete(outcome);
        });

        rx
    }

    async fn settle(
        &self,
        pending: OutcomeReceiver,
        now: DateTime<Utc>,
    ) -> Result<CacheRead, CacheError> {
        match wait_for_outcome(pending).await {
            Ok(snapshot) => Ok(CacheRead::fresh(snapshot)),
            Err(err) => {
                let fallback = self.inner.lock_state().snapshot.clone();
                match fallback {
                    Some(snapshot) => {
                        let still_fresh =
                            snapshot.is_fresh(now, self.inner.settings.freshness_window);
                        warn!(
                            "Serving snapshot from {} after failed refresh: {err}",
                            format_timestamp(snapshot.fetched_at())
                        );
                        Ok(CacheRead::fallback(snapshot, err, still_fresh))
                    }
                    None => Err(CacheError::UpstreamUnavailable(err)),
                }
            }
        }
    }
}

async fn wait_for_outcome(mut rx: OutcomeReceiver) -> FetchOutcome {
    loop {
        let current = rx.borrow_and_update().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone().unwrap_or(Err(UpstreamError::Abandoned));
        }
    }
}
