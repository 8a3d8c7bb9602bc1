//! Storage keys.
//!
//! These names match what the browser build wrote to local storage and must
//! not change, or previously persisted data becomes unreachable.

/// Weather snapshots, newest first.
pub const WEATHER: &str = "krishimitra_weather";
/// Soil test history, newest first.
pub const SOIL_HISTORY: &str = "krishimitra_soil_history";
/// Advisories, newest first.
pub const ADVISORIES: &str = "krishimitra_advisories";
/// Last successful sync, epoch milliseconds as a decimal string.
pub const LAST_SYNC: &str = "krishimitra_last_sync";
/// Pending actions, oldest first.
pub const OFFLINE_QUEUE: &str = "krishimitra_offline_queue";
/// Record layout version written by this crate.
pub const SCHEMA_VERSION: &str = "krishimitra_schema_version";

/// Every key the store owns.
pub const ALL: [&str; 6] = [
    WEATHER,
    SOIL_HISTORY,
    ADVISORIES,
    LAST_SYNC,
    OFFLINE_QUEUE,
    SCHEMA_VERSION,
];
