//! Offline-first local persistence for KrishiMitra.
//!
//! This crate keeps the records the app needs while offline: weather
//! snapshots, soil test history, advisories, the pending-action queue and
//! the last-sync marker. Each lives under a fixed key (see [`keys`]) as a
//! JSON document, so data written by the browser build stays readable.
//!
//! # Features
//!
//! - Pluggable [`KvBackend`]: SQLite on disk or an in-memory map
//! - Weather capped at the newest 10 snapshots
//! - Fail-closed decoding: corrupt or unknown records read as absent
//! - Atomic read-modify-write for every operation
//!
//! # Example
//!
//! ```no_run
//! use krishimitra_store::Store;
//!
//! let store = Store::open_default()?;
//! println!("{} unread advisories", store.unread_advisory_count());
//! # Ok::<(), krishimitra_store::Error>(())
//! ```

mod backend;
mod error;
pub mod keys;
mod schema;
mod sqlite;
mod store;

pub use backend::{KvBackend, MemoryBackend};
pub use error::{Error, Result};
pub use sqlite::SqliteBackend;
pub use store::{LAYOUT_VERSION, Store, StoreSummary, WEATHER_CAPACITY};

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/krishimitra/offline.db`
/// - macOS: `~/Library/Application Support/krishimitra/offline.db`
/// - Windows: `C:\Users\<user>\AppData\Local\krishimitra\offline.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("krishimitra")
        .join("offline.db")
}
