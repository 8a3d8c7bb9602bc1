//! Mock remote for testing.
//!
//! [`MockRemote`] implements [`RemoteApi`] with scripted data and records
//! every replay it accepts, so tests can drive sync cycles without a server.
//!
//! # Features
//!
//! - **Failure injection**: fail the k-th replay, reject replays, fail fetches,
//!   or go fully unreachable
//! - **Latency simulation**: delay every call to exercise timeouts
//! - **Call recording**: inspect accepted replays and call counts

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use krishimitra_types::{Advisory, WeatherSnapshot, now_millis};

use super::{RemoteApi, ReplayRequest, ReplayResponse};
use crate::error::RemoteError;

/// A scripted remote backend.
///
/// # Example
///
/// ```
/// use krishimitra_sync::{MockRemote, RemoteApi};
///
/// #[tokio::main]
/// async fn main() {
///     let remote = MockRemote::new();
///     remote.set_unreachable(true);
///     assert!(remote.health().await.is_err());
/// }
/// ```
pub struct MockRemote {
    weather: RwLock<WeatherSnapshot>,
    advisories: RwLock<Vec<Advisory>>,
    replayed: RwLock<Vec<ReplayRequest>>,
    replay_calls: AtomicU32,
    fetch_calls: AtomicU32,
    /// 1-based replay call number that fails (0 = none).
    fail_replay_at: AtomicU32,
    reject_replays: AtomicBool,
    fail_fetches: AtomicBool,
    unreachable: AtomicBool,
    latency_ms: AtomicU64,
}

impl std::fmt::Debug for MockRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRemote")
            .field("replay_calls", &self.replay_calls.load(Ordering::Relaxed))
            .field("fetch_calls", &self.fetch_calls.load(Ordering::Relaxed))
            .field("unreachable", &self.unreachable.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MockRemote {
    /// A reachable remote that accepts every replay, serves a fixed weather
    /// snapshot and publishes no advisories.
    pub fn new() -> Self {
        Self {
            weather: RwLock::new(Self::default_weather()),
            advisories: RwLock::new(Vec::new()),
            replayed: RwLock::new(Vec::new()),
            replay_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            fail_replay_at: AtomicU32::new(0),
            reject_replays: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            unreachable: AtomicBool::new(false),
            latency_ms: AtomicU64::new(0),
        }
    }

    fn default_weather() -> WeatherSnapshot {
        WeatherSnapshot {
            temperature: "28°C".to_string(),
            humidity: "65%".to_string(),
            rainfall: "12mm".to_string(),
            wind_speed: "8 km/h".to_string(),
            condition: "Partly Cloudy".to_string(),
            location: "Farm Location".to_string(),
            timestamp: now_millis(),
        }
    }

    /// Serve `weather` from now on.
    pub async fn set_weather(&self, weather: WeatherSnapshot) {
        *self.weather.write().await = weather;
    }

    /// Publish `advisories` from now on.
    pub async fn set_advisories(&self, advisories: Vec<Advisory>) {
        *self.advisories.write().await = advisories;
    }

    /// Fail the `call`-th replay (1-based, counted across the mock's lifetime).
    pub fn set_fail_replay_at(&self, call: Option<u32>) {
        self.fail_replay_at.store(call.unwrap_or(0), Ordering::SeqCst);
    }

    /// Answer every replay with `success: false`.
    pub fn set_reject_replays(&self, reject: bool) {
        self.reject_replays.store(reject, Ordering::SeqCst);
    }

    /// Make weather and advisory fetches fail.
    pub fn set_fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Make every call fail, including the health check.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Replays accepted so far, in arrival order.
    pub async fn replayed(&self) -> Vec<ReplayRequest> {
        self.replayed.read().await.clone()
    }

    /// Number of replay calls, including failed ones.
    pub fn replay_count(&self) -> u32 {
        self.replay_calls.load(Ordering::SeqCst)
    }

    /// Number of weather and advisory fetch calls.
    pub fn fetch_count(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    async fn simulate_call(&self) -> Result<(), RemoteError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("mock remote unreachable".to_string()));
        }
        Ok(())
    }

    async fn simulate_fetch(&self) -> Result<(), RemoteError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_call().await?;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 503,
                message: "mock fetch failure".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn replay(&self, request: &ReplayRequest) -> Result<ReplayResponse, RemoteError> {
        let call = self.replay_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.simulate_call().await?;

        if self.fail_replay_at.load(Ordering::SeqCst) == call {
            return Err(RemoteError::Api {
                status: 500,
                message: format!("mock failure on replay {}", call),
            });
        }
        if self.reject_replays.load(Ordering::SeqCst) {
            return Ok(ReplayResponse::rejected("mock rejection"));
        }

        self.replayed.write().await.push(request.clone());
        Ok(ReplayResponse::accepted())
    }

    async fn fetch_weather(&self) -> Result<WeatherSnapshot, RemoteError> {
        self.simulate_fetch().await?;
        Ok(self.weather.read().await.clone())
    }

    async fn fetch_advisories(&self) -> Result<Vec<Advisory>, RemoteError> {
        self.simulate_fetch().await?;
        Ok(self.advisories.read().await.clone())
    }

    async fn health(&self) -> Result<(), RemoteError> {
        self.simulate_call().await
    }
}
