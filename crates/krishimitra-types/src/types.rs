//! Core record types for the offline store.
//!
//! Field names serialize in camelCase so records stay readable by the
//! browser build that wrote the original local-storage data.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Milliseconds in one hour.
pub const HOUR_MS: Timestamp = 60 * 60 * 1000;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Timestamp {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as Timestamp
}

/// Convert an epoch-millisecond timestamp into an `OffsetDateTime`.
///
/// Returns `None` when the value is outside the range `time` can represent.
pub fn to_datetime(timestamp: Timestamp) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(timestamp as i128 * 1_000_000).ok()
}

/// A weather observation as shown on the dashboard cards.
///
/// Values are display strings (`"28°C"`, `"65%"`) exactly as the remote
/// source reports them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    /// Temperature, e.g. `"28°C"`.
    pub temperature: String,
    /// Relative humidity, e.g. `"65%"`.
    pub humidity: String,
    /// Rainfall, e.g. `"12mm"`.
    pub rainfall: String,
    /// Wind speed, e.g. `"8 km/h"`.
    pub wind_speed: String,
    /// Condition label, e.g. `"Partly Cloudy"`.
    pub condition: String,
    /// Location label.
    pub location: String,
    /// Capture time in epoch milliseconds.
    pub timestamp: Timestamp,
}

/// One soil test result.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoilHistoryEntry {
    /// Entry identifier. Older records may not carry one.
    #[serde(default)]
    pub id: String,
    /// Soil pH (0-14).
    pub ph: f64,
    /// Nitrogen level.
    pub nitrogen: f64,
    /// Phosphorus level.
    pub phosphorus: f64,
    /// Potassium level.
    pub potassium: f64,
    /// Moisture level.
    pub moisture: f64,
    /// Location label.
    pub location: String,
    /// Test time in epoch milliseconds.
    pub timestamp: Timestamp,
}

/// Advisory category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryCategory {
    Weather,
    Pest,
    Disease,
    General,
}

impl AdvisoryCategory {
    /// The tag used on disk and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdvisoryCategory::Weather => "weather",
            AdvisoryCategory::Pest => "pest",
            AdvisoryCategory::Disease => "disease",
            AdvisoryCategory::General => "general",
        }
    }
}

impl fmt::Display for AdvisoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdvisoryCategory {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "weather" => Ok(AdvisoryCategory::Weather),
            "pest" => Ok(AdvisoryCategory::Pest),
            "disease" => Ok(AdvisoryCategory::Disease),
            "general" => Ok(AdvisoryCategory::General),
            _ => Err(ParseError::UnknownCategory(s.to_string())),
        }
    }
}

/// A short categorized notification with a read/unread state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    /// Unique identifier, supplied by whoever creates the advisory.
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: AdvisoryCategory,
    /// Language tag (`en`, `hi`, `pa`).
    pub language: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: Timestamp,
    /// Whether the user has acknowledged the advisory.
    #[serde(default)]
    pub is_read: bool,
}

impl Advisory {
    /// Create an unread English advisory stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
        category: AdvisoryCategory,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            category,
            language: "en".to_string(),
            timestamp: now_millis(),
            is_read: false,
        }
    }

    /// Set the language tag.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the creation timestamp.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Whether the advisory was created within `window_ms` before `now`.
    pub fn is_recent(&self, now: Timestamp, window_ms: Timestamp) -> bool {
        now.saturating_sub(self.timestamp) < window_ms
    }
}

/// The kind of mutation a pending action replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Upload of a locally recorded weather snapshot.
    WeatherUpdate,
    /// Upload of a locally recorded soil test.
    SoilUpdate,
    /// Acknowledgment that an advisory was read.
    AdvisoryRead,
}

impl ActionKind {
    /// The tag used on disk and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::WeatherUpdate => "WEATHER_UPDATE",
            ActionKind::SoilUpdate => "SOIL_UPDATE",
            ActionKind::AdvisoryRead => "ADVISORY_READ",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "WEATHER_UPDATE" => Ok(ActionKind::WeatherUpdate),
            "SOIL_UPDATE" => Ok(ActionKind::SoilUpdate),
            "ADVISORY_READ" => Ok(ActionKind::AdvisoryRead),
            _ => Err(ParseError::UnknownActionKind(s.to_string())),
        }
    }
}

/// A locally queued mutation awaiting replay against the remote backend.
///
/// On disk the kind and payload live under `type` and `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// Idempotency key assigned at enqueue time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(rename = "data", default)]
    pub payload: serde_json::Value,
    /// Enqueue time in epoch milliseconds.
    pub timestamp: Timestamp,
}

impl PendingAction {
    /// Create an action with a fresh idempotency key, stamped now.
    pub fn new(kind: ActionKind, payload: serde_json::Value) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            kind,
            payload,
            timestamp: now_millis(),
        }
    }

    /// Key the remote uses to recognise a replay it has already applied.
    ///
    /// Actions queued before keys existed fall back to kind and timestamp.
    pub fn idempotency_key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!("{}-{}", self.kind, self.timestamp),
        }
    }
}
