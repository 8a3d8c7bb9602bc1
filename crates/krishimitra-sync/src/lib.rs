//! Background synchronization for the KrishiMitra offline store.
//!
//! This crate keeps a [`krishimitra_store::Store`] in step with a remote
//! backend. Offline edits sit in the store's pending queue; whenever the
//! device is online the [`SyncManager`] replays them and pulls fresh weather
//! and advisories.
//!
//! # Features
//!
//! - **All-or-nothing replay**: the queue is cleared only when every action
//!   was accepted
//! - **Advisory rate limit**: at most 3 advisories per 24 hours before new
//!   weather advisories are held back
//! - **Connectivity aware**: cycles run on reconnect, on a periodic tick while
//!   online, and on demand
//! - **Pluggable transport**: HTTP, simulated, or mock via [`RemoteApi`]
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use krishimitra_store::Store;
//! use krishimitra_sync::{Connectivity, SimulatedRemote, SyncManager, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(Store::open_default()?);
//!     let connectivity = Connectivity::new(true);
//!     let manager = Arc::new(SyncManager::new(
//!         store,
//!         Arc::new(SimulatedRemote::default()),
//!         connectivity.clone(),
//!         SyncOptions::default(),
//!     ));
//!
//!     let handle = manager.start();
//!     tokio::signal::ctrl_c().await?;
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod connectivity;
pub mod error;
pub mod events;
pub mod manager;
pub mod remote;

pub use connectivity::{Connectivity, ConnectivityProbe};
pub use error::{RemoteError, Result, SyncError};
pub use events::{EventDispatcher, EventReceiver, EventSender, SuppressReason, SyncEvent};
pub use manager::{CycleReport, FetchReport, SyncHandle, SyncManager, SyncOptions, SyncPhase};
#[cfg(feature = "http")]
pub use remote::HttpRemote;
pub use remote::{MockRemote, RemoteApi, ReplayRequest, ReplayResponse, SimulatedRemote};
