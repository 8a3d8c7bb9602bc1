//! Remote backend abstraction.
//!
//! The [`RemoteApi`] trait covers the four calls the sync layer makes:
//! replaying a queued action, fetching the current weather, fetching current
//! advisories, and a health check used as the connectivity probe.
//!
//! Implementations:
//! - [`HttpRemote`]: JSON over HTTP (feature `http`, on by default)
//! - [`SimulatedRemote`]: locally generated data for demos and offline development
//! - [`MockRemote`]: scripted responses and failure injection for tests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use krishimitra_types::{ActionKind, Advisory, PendingAction, Timestamp, WeatherSnapshot};

use crate::error::RemoteError;

#[cfg(feature = "http")]
mod http;
mod mock;
mod simulated;

#[cfg(feature = "http")]
pub use http::HttpRemote;
pub use mock::MockRemote;
pub use simulated::SimulatedRemote;

/// Body of a replay call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayRequest {
    /// Lets the remote drop replays it already applied.
    pub idempotency_key: String,
    pub kind: ActionKind,
    pub payload: serde_json::Value,
    /// When the action was queued locally.
    pub queued_at: Timestamp,
}

impl From<&PendingAction> for ReplayRequest {
    fn from(action: &PendingAction) -> Self {
        Self {
            idempotency_key: action.idempotency_key(),
            kind: action.kind,
            payload: action.payload.clone(),
            queued_at: action.timestamp,
        }
    }
}

/// Answer to a replay call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ReplayResponse {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Operations the sync layer needs from the remote backend.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Apply one queued mutation on the remote.
    async fn replay(&self, request: &ReplayRequest) -> Result<ReplayResponse, RemoteError>;

    /// Current weather for the farm.
    async fn fetch_weather(&self) -> Result<WeatherSnapshot, RemoteError>;

    /// Advisories the remote currently publishes.
    async fn fetch_advisories(&self) -> Result<Vec<Advisory>, RemoteError>;

    /// Cheap reachability check.
    async fn health(&self) -> Result<(), RemoteError>;
}
