//! Command-line service that keeps the KrishiMitra offline store in sync.
//!
//! This crate provides:
//! - TOML configuration with validation
//! - Assembly of store, remote transport, connectivity probe and sync loop
//! - Logging of sync events as user-facing notifications
//! - Text rendering for status and advisory listings
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/krishimitra/sync.toml`:
//!
//! ```toml
//! [storage]
//! path = "~/.local/share/krishimitra/offline.db"
//!
//! [remote]
//! base_url = "http://127.0.0.1:8000"
//! simulate = false
//! request_timeout = 10
//!
//! [sync]
//! interval = 30
//! advisory_window_hours = 24
//! advisory_limit = 3
//!
//! [connectivity]
//! probe_interval = 15
//! ```

pub mod app;
pub mod config;
pub mod monitor;
pub mod status;

pub use app::{App, AppError, Running, build_remote};
pub use config::{
    Config, ConfigError, ConnectivityConfig, RemoteConfig, StorageConfig, SyncConfig,
    ValidationError,
};
pub use monitor::EventLogger;
