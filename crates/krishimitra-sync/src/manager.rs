//! The sync manager.
//!
//! A [`SyncManager`] runs sync cycles against a [`RemoteApi`]. A cycle has
//! two phases:
//!
//! 1. **Draining**: replay every pending action in queue order. Only when the
//!    whole batch succeeds are the replayed entries removed and the sync time
//!    recorded; any failure leaves the queue untouched.
//! 2. **Fetching**: fetch current weather and advisories and store them. This
//!    runs whatever the drain outcome was.
//!
//! [`SyncManager::start`] spawns the background loop that triggers cycles on
//! a periodic tick while online, on every offline to online transition and on
//! [`SyncHandle::sync_now`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Notify, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use krishimitra_store::Store;
use krishimitra_types::{
    Advisory, AdvisoryCategory, PendingAction, Timestamp, Validate, WeatherSnapshot, now_millis,
};

use crate::connectivity::Connectivity;
use crate::error::{RemoteError, Result, SyncError};
use crate::events::{EventDispatcher, EventReceiver, SuppressReason, SyncEvent};
use crate::remote::{RemoteApi, ReplayRequest};

/// Tuning for the sync loop.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Time between periodic cycles while online.
    pub interval: Duration,
    /// Deadline for each remote call.
    pub request_timeout: Duration,
    /// Window the advisory rate limit looks back over.
    pub advisory_window: Duration,
    /// Stored advisories within the window that block a new weather advisory.
    pub advisory_limit: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            request_timeout: Duration::from_secs(10),
            advisory_window: Duration::from_secs(24 * 60 * 60),
            advisory_limit: 3,
        }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the periodic sync interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-call remote timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the advisory rate-limit window.
    pub fn advisory_window(mut self, window: Duration) -> Self {
        self.advisory_window = window;
        self
    }

    /// Set the advisory rate limit.
    pub fn advisory_limit(mut self, limit: usize) -> Self {
        self.advisory_limit = limit;
        self
    }

    /// Validate the options.
    ///
    /// Returns an error if any value would stall or flood the loop.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(SyncError::InvalidConfig("interval must be > 0".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(SyncError::InvalidConfig(
                "request_timeout must be > 0".to_string(),
            ));
        }
        if self.request_timeout >= self.interval {
            return Err(SyncError::InvalidConfig(
                "request_timeout must be shorter than interval".to_string(),
            ));
        }
        if self.advisory_window.is_zero() {
            return Err(SyncError::InvalidConfig(
                "advisory_window must be > 0".to_string(),
            ));
        }
        if self.advisory_limit == 0 {
            return Err(SyncError::InvalidConfig(
                "advisory_limit must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn advisory_window_ms(&self) -> Timestamp {
        Timestamp::try_from(self.advisory_window.as_millis()).unwrap_or(Timestamp::MAX)
    }
}

/// What the manager is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Offline, or waiting for the next trigger.
    Idle,
    /// Replaying the pending queue.
    Draining,
    /// Fetching weather and advisories.
    Fetching,
}

/// Outcome of the fetch phase.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// The stored weather snapshot.
    pub weather: Option<WeatherSnapshot>,
    /// Ids of advisories that were stored.
    pub added: Vec<String>,
    /// Advisories that were not stored, and why.
    pub suppressed: Vec<(String, SuppressReason)>,
}

/// Outcome of one sync cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// Whether the cycle ran at all.
    pub online: bool,
    /// Number of actions replayed, or why the drain failed.
    pub drain: Result<usize>,
    /// What the fetch phase stored, or why it failed.
    pub fetch: Result<FetchReport>,
}

impl CycleReport {
    fn offline() -> Self {
        Self {
            online: false,
            drain: Err(SyncError::Offline),
            fetch: Err(SyncError::Offline),
        }
    }

    /// Whether both phases succeeded.
    pub fn is_success(&self) -> bool {
        self.drain.is_ok() && self.fetch.is_ok()
    }
}

/// Keeps the local store and the remote backend in step.
pub struct SyncManager {
    store: Arc<Store>,
    remote: Arc<dyn RemoteApi>,
    connectivity: Connectivity,
    options: SyncOptions,
    events: EventDispatcher,
    phase: watch::Sender<SyncPhase>,
    /// Held for the duration of a cycle.
    cycle_lock: Mutex<()>,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("options", &self.options)
            .field("online", &self.connectivity.is_online())
            .field("phase", &*self.phase.borrow())
            .finish()
    }
}

impl SyncManager {
    pub fn new(
        store: Arc<Store>,
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
        options: SyncOptions,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            remote,
            connectivity,
            options,
            events: EventDispatcher::default(),
            phase,
            cycle_lock: Mutex::new(()),
        }
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    /// The current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    pub fn watch_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.connectivity
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn set_phase(&self, phase: SyncPhase) {
        self.phase.send_replace(phase);
    }

    /// Run a remote call under the configured deadline.
    async fn call<T>(
        &self,
        fut: impl Future<Output = std::result::Result<T, RemoteError>>,
    ) -> Result<T> {
        match timeout(self.options.request_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(SyncError::Timeout(self.options.request_timeout)),
        }
    }

    /// Run one full cycle.
    ///
    /// Does nothing while offline. Cycles never overlap; a call made while a
    /// cycle is in progress waits for it to finish and then runs its own.
    pub async fn run_cycle(&self) -> CycleReport {
        if !self.connectivity.is_online() {
            debug!("Skipping sync cycle while offline");
            return CycleReport::offline();
        }

        let _guard = self.cycle_lock.lock().await;
        self.events.send(SyncEvent::CycleStarted);

        self.set_phase(SyncPhase::Draining);
        let drain = self.drain_pending().await;

        self.set_phase(SyncPhase::Fetching);
        let fetch = self.fetch_latest().await;

        self.set_phase(SyncPhase::Idle);

        let report = CycleReport {
            online: true,
            drain,
            fetch,
        };
        self.events.send(SyncEvent::CycleFinished {
            success: report.is_success(),
        });
        report
    }

    /// Replay the pending queue.
    ///
    /// All-or-nothing: on success the replayed entries are removed and the
    /// sync time is recorded; on failure the queue is left exactly as it was.
    /// An empty queue is a no-op that leaves the sync marker alone.
    /// Returns the number of actions replayed.
    pub async fn drain_pending(&self) -> Result<usize> {
        let batch = self.store.pending_queue();
        if batch.is_empty() {
            debug!("Nothing to sync");
            return Ok(0);
        }

        match self.replay_batch(&batch).await {
            Ok(()) => {
                let settled = self.store.settle_pending_queue(&batch)?;
                if settled < batch.len() {
                    warn!(
                        "Queue changed during sync: settled {} of {} replayed actions",
                        settled,
                        batch.len()
                    );
                }
                let at = self.store.record_sync_timestamp()?;
                info!("Synced {} pending action(s)", batch.len());
                self.events.send(SyncEvent::Synced {
                    replayed: batch.len(),
                    at,
                });
                Ok(batch.len())
            }
            Err(e) => {
                warn!("Sync failed, will retry later: {}", e);
                self.events.send(SyncEvent::SyncFailed {
                    error: e.to_string(),
                    pending: batch.len(),
                });
                Err(e)
            }
        }
    }

    async fn replay_batch(&self, batch: &[PendingAction]) -> Result<()> {
        for action in batch {
            let request = ReplayRequest::from(action);
            debug!("Replaying {} ({})", request.kind, request.idempotency_key);
            let response = self.call(self.remote.replay(&request)).await?;
            if !response.success {
                if let Some(message) = &response.message {
                    debug!("Remote rejected {}: {}", request.idempotency_key, message);
                }
                return Err(SyncError::Rejected {
                    kind: request.kind,
                    key: request.idempotency_key,
                });
            }
        }
        Ok(())
    }

    /// Fetch current weather and advisories into the store.
    ///
    /// Advisories already stored are skipped. A weather advisory is skipped
    /// when the store already holds `advisory_limit` advisories from within
    /// `advisory_window`.
    pub async fn fetch_latest(&self) -> Result<FetchReport> {
        let result = self.fetch_into_store().await;
        if let Err(e) = &result {
            warn!("Failed to fetch latest data: {}", e);
            self.events.send(SyncEvent::FetchFailed {
                error: e.to_string(),
            });
        }
        result
    }

    async fn fetch_into_store(&self) -> Result<FetchReport> {
        let weather = self.call(self.remote.fetch_weather()).await?;
        let validation = weather.validate();
        if !validation.is_valid {
            return Err(SyncError::InvalidRecord(validation.summary()));
        }
        self.store.save_weather(weather.clone())?;
        self.events.send(SyncEvent::WeatherUpdated {
            snapshot: weather.clone(),
        });

        let fetched = self.call(self.remote.fetch_advisories()).await?;
        let (added, suppressed) = self.insert_advisories(fetched)?;

        debug!(
            "Fetched weather and {} new advisory(ies), {} suppressed",
            added.len(),
            suppressed.len()
        );
        Ok(FetchReport {
            weather: Some(weather),
            added: added.into_iter().map(|a| a.id).collect(),
            suppressed,
        })
    }

    /// Insert fetched advisories under one store lock.
    fn insert_advisories(
        &self,
        fetched: Vec<Advisory>,
    ) -> Result<(Vec<Advisory>, Vec<(String, SuppressReason)>)> {
        let now = now_millis();
        let window_ms = self.options.advisory_window_ms();
        let limit = self.options.advisory_limit;

        let (added, suppressed) = self.store.update_advisories(|stored| {
            let mut added = Vec::new();
            let mut suppressed = Vec::new();

            for advisory in fetched {
                let validation = advisory.validate();
                if !validation.is_valid {
                    warn!(
                        "Dropping invalid advisory {:?}: {}",
                        advisory.id,
                        validation.summary()
                    );
                    suppressed.push((advisory.id, SuppressReason::Invalid));
                    continue;
                }
                if stored.iter().any(|a| a.id == advisory.id) {
                    suppressed.push((advisory.id, SuppressReason::Duplicate));
                    continue;
                }
                if advisory.category == AdvisoryCategory::Weather {
                    let recent = stored
                        .iter()
                        .filter(|a| a.is_recent(now, window_ms))
                        .count();
                    if recent >= limit {
                        suppressed.push((advisory.id, SuppressReason::RateLimited));
                        continue;
                    }
                }
                stored.insert(0, advisory.clone());
                added.push(advisory);
            }

            (added, suppressed)
        })?;

        for advisory in &added {
            self.events.send(SyncEvent::AdvisoryAdded {
                advisory: advisory.clone(),
            });
        }
        for (id, reason) in &suppressed {
            debug!("Advisory {} not stored: {:?}", id, reason);
            self.events.send(SyncEvent::AdvisorySuppressed {
                id: id.clone(),
                reason: *reason,
            });
        }
        Ok((added, suppressed))
    }

    /// Spawn the background sync loop.
    ///
    /// Runs a cycle immediately if online, then on every periodic tick while
    /// online, on every offline to online transition (which also restarts the
    /// tick) and on [`SyncHandle::sync_now`]. Runs until
    /// [`SyncHandle::shutdown`].
    pub fn start(self: &Arc<Self>) -> SyncHandle {
        let cancel = CancellationToken::new();
        let trigger = Arc::new(Notify::new());

        let manager = Arc::clone(self);
        let task = tokio::spawn({
            let cancel = cancel.clone();
            let trigger = Arc::clone(&trigger);
            async move { manager.run_loop(cancel, trigger).await }
        });

        SyncHandle {
            cancel,
            trigger,
            task,
        }
    }

    async fn run_loop(&self, cancel: CancellationToken, trigger: Arc<Notify>) {
        info!("Sync loop started (interval {:?})", self.options.interval);

        let mut online_rx = self.connectivity.subscribe();

        let period = self.options.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        if self.connectivity.is_online() {
            self.log_cycle(self.run_cycle().await);
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Sync loop cancelled, shutting down");
                    break;
                }
                // Idle while offline: the ticker is not polled
                _ = ticker.tick(), if self.connectivity.is_online() => {
                    self.log_cycle(self.run_cycle().await);
                }
                changed = online_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let online = *online_rx.borrow_and_update();
                    self.events.send(SyncEvent::ConnectivityChanged { online });
                    if online {
                        ticker.reset();
                        self.log_cycle(self.run_cycle().await);
                    }
                }
                _ = trigger.notified() => {
                    self.log_cycle(self.run_cycle().await);
                }
            }
        }
    }

    fn log_cycle(&self, report: CycleReport) {
        if !report.online {
            debug!("Sync requested while offline");
        } else if report.is_success() {
            debug!("Sync cycle completed");
        }
    }
}

/// Controls a running sync loop.
#[derive(Debug)]
pub struct SyncHandle {
    cancel: CancellationToken,
    trigger: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SyncHandle {
    /// Ask for a cycle as soon as the loop is free.
    pub fn sync_now(&self) {
        self.trigger.notify_one();
    }

    /// A token that stops the loop when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// A cycle already in progress finishes first.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!("Sync loop ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;
    use krishimitra_types::{ActionKind, HOUR_MS};
    use serde_json::json;

    fn setup(online: bool) -> (Arc<Store>, Arc<MockRemote>, SyncManager) {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let remote = Arc::new(MockRemote::new());
        let manager = SyncManager::new(
            Arc::clone(&store),
            remote.clone(),
            Connectivity::new(online),
            SyncOptions::default(),
        );
        (store, remote, manager)
    }

    fn queue(store: &Store, n: usize) {
        for i in 0..n {
            store
                .enqueue_pending_action(PendingAction::new(
                    ActionKind::SoilUpdate,
                    json!({"ph": 6.5, "seq": i}),
                ))
                .unwrap();
        }
    }

    fn weather_advisory(id: &str, timestamp: Timestamp) -> Advisory {
        Advisory::new(id, "Weather Alert", "Light rain", AdvisoryCategory::Weather)
            .with_timestamp(timestamp)
    }

    #[test]
    fn test_default_options() {
        let options = SyncOptions::default();
        assert_eq!(options.interval, Duration::from_secs(30));
        assert_eq!(options.request_timeout, Duration::from_secs(10));
        assert_eq!(options.advisory_limit, 3);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_options_validation() {
        let options = SyncOptions::new()
            .interval(Duration::from_secs(5))
            .request_timeout(Duration::from_secs(5));
        assert!(matches!(options.validate(), Err(SyncError::InvalidConfig(_))));

        assert!(SyncOptions::new().advisory_limit(0).validate().is_err());
        assert!(SyncOptions::new().interval(Duration::ZERO).validate().is_err());
    }

    #[tokio::test]
    async fn test_offline_cycle_does_nothing() {
        let (store, remote, manager) = setup(false);
        queue(&store, 2);

        let report = manager.run_cycle().await;
        assert!(!report.online);
        assert!(matches!(report.drain, Err(SyncError::Offline)));
        assert_eq!(remote.replay_count(), 0);
        assert_eq!(remote.fetch_count(), 0);
        assert_eq!(store.pending_queue().len(), 2);
        assert!(store.last_sync_timestamp().is_none());
    }

    #[tokio::test]
    async fn test_drain_replays_in_order_and_clears() {
        let (store, remote, manager) = setup(true);
        queue(&store, 3);
        let expected: Vec<_> = store
            .pending_queue()
            .iter()
            .map(PendingAction::idempotency_key)
            .collect();

        assert_eq!(manager.drain_pending().await.unwrap(), 3);

        let replayed: Vec<_> = remote
            .replayed()
            .await
            .into_iter()
            .map(|r| r.idempotency_key)
            .collect();
        assert_eq!(replayed, expected);
        assert!(store.pending_queue().is_empty());
        assert!(store.last_sync_timestamp().is_some());
    }

    #[tokio::test]
    async fn test_empty_drain_leaves_marker() {
        let (store, remote, manager) = setup(true);
        let mut events = manager.subscribe();

        assert_eq!(manager.drain_pending().await.unwrap(), 0);
        assert!(store.last_sync_timestamp().is_none());
        assert_eq!(remote.replay_count(), 0);

        // The cycle still fetches and reports completion
        let report = manager.run_cycle().await;
        assert!(report.is_success());
        assert!(store.last_sync_timestamp().is_none());
        assert!(matches!(events.recv().await.unwrap(), SyncEvent::CycleStarted));
        loop {
            match events.recv().await.unwrap() {
                SyncEvent::Synced { .. } => panic!("empty queue reported as synced"),
                SyncEvent::CycleFinished { success } => {
                    assert!(success);
                    break;
                }
                _ => {}
            }
        }
    }

    #[tokio::test]
    async fn test_drain_failure_leaves_queue() {
        let (store, remote, manager) = setup(true);
        queue(&store, 4);
        let before = store.pending_queue();
        remote.set_fail_replay_at(Some(3));
        let mut events = manager.subscribe();

        let result = manager.drain_pending().await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert_eq!(store.pending_queue(), before);
        assert!(store.last_sync_timestamp().is_none());
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::SyncFailed { pending: 4, .. }
        ));
    }

    #[tokio::test]
    async fn test_rejected_replay_fails_drain() {
        let (store, remote, manager) = setup(true);
        queue(&store, 1);
        remote.set_reject_replays(true);

        let result = manager.drain_pending().await;
        assert!(matches!(result, Err(SyncError::Rejected { .. })));
        assert_eq!(store.pending_queue().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_remote_times_out() {
        let (store, remote, manager) = setup(true);
        queue(&store, 1);
        remote.set_latency(Duration::from_secs(60));

        let result = manager.drain_pending().await;
        assert!(matches!(result, Err(SyncError::Timeout(_))));
        assert!(result.unwrap_err().is_transient());
        assert_eq!(store.pending_queue().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_runs_after_failed_drain() {
        let (store, remote, manager) = setup(true);
        queue(&store, 1);
        remote.set_fail_replay_at(Some(1));

        let report = manager.run_cycle().await;
        assert!(report.drain.is_err());
        assert!(report.fetch.is_ok());
        assert_eq!(store.weather().len(), 1);
        assert_eq!(manager.phase(), SyncPhase::Idle);
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_fourth_weather_advisory() {
        let (store, remote, manager) = setup(true);
        let now = now_millis();
        for i in 0..3 {
            store
                .save_advisory(weather_advisory(&format!("old_{}", i), now - HOUR_MS))
                .unwrap();
        }
        remote
            .set_advisories(vec![weather_advisory("advisory_new", now)])
            .await;

        let report = manager.fetch_latest().await.unwrap();
        assert!(report.added.is_empty());
        assert_eq!(
            report.suppressed,
            vec![("advisory_new".to_string(), SuppressReason::RateLimited)]
        );
        assert_eq!(store.advisories().len(), 3);
    }

    #[tokio::test]
    async fn test_rate_limit_allows_third() {
        let (store, remote, manager) = setup(true);
        let now = now_millis();
        for i in 0..2 {
            store
                .save_advisory(weather_advisory(&format!("old_{}", i), now - HOUR_MS))
                .unwrap();
        }
        remote
            .set_advisories(vec![weather_advisory("advisory_new", now)])
            .await;

        let report = manager.fetch_latest().await.unwrap();
        assert_eq!(report.added, vec!["advisory_new"]);
        assert_eq!(store.advisories()[0].id, "advisory_new");
    }

    #[tokio::test]
    async fn test_rate_limit_ignores_stale_advisories() {
        let (store, remote, manager) = setup(true);
        let now = now_millis();
        for i in 0..5 {
            store
                .save_advisory(weather_advisory(&format!("stale_{}", i), now - 48 * HOUR_MS))
                .unwrap();
        }
        remote
            .set_advisories(vec![weather_advisory("weather_new", now)])
            .await;

        let report = manager.fetch_latest().await.unwrap();
        assert_eq!(report.added, vec!["weather_new"]);
    }

    #[tokio::test]
    async fn test_rate_limit_only_blocks_weather() {
        let (store, remote, manager) = setup(true);
        let now = now_millis();
        for i in 0..3 {
            store
                .save_advisory(weather_advisory(&format!("recent_{}", i), now))
                .unwrap();
        }
        remote
            .set_advisories(vec![
                Advisory::new("pest_1", "Aphids", "Spray neem oil", AdvisoryCategory::Pest),
                weather_advisory("weather_new", now),
            ])
            .await;

        let report = manager.fetch_latest().await.unwrap();
        assert_eq!(report.added, vec!["pest_1"]);
        assert_eq!(
            report.suppressed,
            vec![("weather_new".to_string(), SuppressReason::RateLimited)]
        );
        assert_eq!(store.advisories().len(), 4);
    }

    #[tokio::test]
    async fn test_duplicate_advisory_skipped() {
        let (store, remote, manager) = setup(true);
        let mut existing = weather_advisory("advisory_1", now_millis());
        existing.is_read = true;
        store.save_advisory(existing).unwrap();
        remote
            .set_advisories(vec![weather_advisory("advisory_1", now_millis())])
            .await;

        let report = manager.fetch_latest().await.unwrap();
        assert_eq!(
            report.suppressed,
            vec![("advisory_1".to_string(), SuppressReason::Duplicate)]
        );
        assert!(store.advisories()[0].is_read);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_reported() {
        let (store, remote, manager) = setup(true);
        remote.set_fail_fetches(true);
        let mut events = manager.subscribe();

        assert!(manager.fetch_latest().await.is_err());
        assert!(store.weather().is_empty());
        assert!(matches!(
            events.recv().await.unwrap(),
            SyncEvent::FetchFailed { .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_weather_rejected() {
        let (store, remote, manager) = setup(true);
        remote
            .set_weather(WeatherSnapshot {
                timestamp: 0,
                ..Default::default()
            })
            .await;

        let result = manager.fetch_latest().await;
        assert!(matches!(result, Err(SyncError::InvalidRecord(_))));
        assert!(store.weather().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_syncs_on_reconnect() {
        let (store, remote, manager) = setup(false);
        queue(&store, 2);
        let manager = Arc::new(manager);
        let mut events = manager.subscribe();
        let handle = manager.start();

        manager.connectivity().set_online(true);
        loop {
            if let SyncEvent::Synced { replayed, .. } = events.recv().await.unwrap() {
                assert_eq!(replayed, 2);
                break;
            }
        }
        assert_eq!(remote.replay_count(), 2);
        assert!(store.pending_queue().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_ticks_only_while_online() {
        let (_store, remote, manager) = setup(false);
        let manager = Arc::new(manager);
        let handle = manager.start();

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(remote.fetch_count(), 0);

        manager.connectivity().set_online(true);
        // Reconnect cycle plus ticks at +30s and +60s
        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(remote.fetch_count(), 6);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_idles_after_going_offline() {
        let (_store, remote, manager) = setup(true);
        let manager = Arc::new(manager);
        let mut events = manager.subscribe();
        let handle = manager.start();

        while !matches!(events.recv().await.unwrap(), SyncEvent::CycleFinished { .. }) {}
        assert_eq!(remote.fetch_count(), 2);

        manager.connectivity().set_online(false);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(remote.fetch_count(), 2);
        assert!(!handle.is_finished());

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_now_runs_cycle() {
        let (_store, remote, manager) = setup(true);
        let manager = Arc::new(manager);
        let mut events = manager.subscribe();
        let handle = manager.start();

        // Startup cycle
        while !matches!(events.recv().await.unwrap(), SyncEvent::CycleFinished { .. }) {}

        handle.sync_now();
        while !matches!(events.recv().await.unwrap(), SyncEvent::CycleFinished { .. }) {}

        assert_eq!(remote.fetch_count(), 4);
        handle.shutdown().await;
    }
}
