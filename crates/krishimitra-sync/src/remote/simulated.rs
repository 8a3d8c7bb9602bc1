//! Locally generated remote data.
//!
//! Accepts every replay and invents plausible weather, for running the sync
//! loop without a backend.

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use krishimitra_types::{Advisory, AdvisoryCategory, WeatherSnapshot, now_millis};

use super::{RemoteApi, ReplayRequest, ReplayResponse};
use crate::error::RemoteError;

const CONDITIONS: [&str; 5] = ["Sunny", "Partly Cloudy", "Cloudy", "Rainy", "Windy"];

/// A remote that never leaves the process.
#[derive(Debug, Clone)]
pub struct SimulatedRemote {
    location: String,
}

impl Default for SimulatedRemote {
    fn default() -> Self {
        Self::new("Farm Location")
    }
}

impl SimulatedRemote {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
        }
    }

    fn random_weather(&self) -> WeatherSnapshot {
        let mut rng = rand::rng();
        WeatherSnapshot {
            temperature: format!("{}°C", rng.random_range(20..35)),
            humidity: format!("{}%", rng.random_range(50..80)),
            rainfall: format!("{}mm", rng.random_range(0..20)),
            wind_speed: format!("{} km/h", rng.random_range(5..20)),
            condition: CONDITIONS[rng.random_range(0..CONDITIONS.len())].to_string(),
            location: self.location.clone(),
            timestamp: now_millis(),
        }
    }
}

#[async_trait]
impl RemoteApi for SimulatedRemote {
    async fn replay(&self, request: &ReplayRequest) -> Result<ReplayResponse, RemoteError> {
        debug!(
            "Simulated replay of {} ({})",
            request.kind, request.idempotency_key
        );
        Ok(ReplayResponse::accepted())
    }

    async fn fetch_weather(&self) -> Result<WeatherSnapshot, RemoteError> {
        Ok(self.random_weather())
    }

    async fn fetch_advisories(&self) -> Result<Vec<Advisory>, RemoteError> {
        let now = now_millis();
        Ok(vec![
            Advisory::new(
                format!("advisory_{}", now),
                "Weather Alert",
                "Expect light rainfall in the next 24 hours. Good time for sowing.",
                AdvisoryCategory::Weather,
            )
            .with_timestamp(now),
        ])
    }

    async fn health(&self) -> Result<(), RemoteError> {
        Ok(())
    }
}
