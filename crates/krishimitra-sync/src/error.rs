//! Error types for krishimitra-sync.

use std::time::Duration;

use krishimitra_types::ActionKind;

/// Errors returned by a [`RemoteApi`](crate::RemoteApi) transport.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The remote could not be reached at all.
    #[cfg(feature = "http")]
    #[error("Remote not reachable at {url}: {source}")]
    NotReachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid base URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The remote answered with an error status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A non-HTTP transport reported a failure.
    #[error("Remote unavailable: {0}")]
    Unavailable(String),
}

/// Errors that can occur during a sync cycle.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No connectivity; nothing was attempted.
    #[error("Offline")]
    Offline,

    /// A remote call failed.
    #[error("Remote call failed: {0}")]
    Remote(#[from] RemoteError),

    /// The remote answered a replay with `success: false`.
    #[error("Remote rejected {kind} action {key}")]
    Rejected { kind: ActionKind, key: String },

    /// The remote sent a record that fails validation.
    #[error("Invalid record from remote: {0}")]
    InvalidRecord(String),

    /// A remote call did not finish in time.
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Writing results to the local store failed.
    #[error("Store error: {0}")]
    Store(#[from] krishimitra_store::Error),

    /// Invalid sync options.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SyncError {
    /// Whether the next cycle may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SyncError::Offline
                | SyncError::Remote(_)
                | SyncError::Rejected { .. }
                | SyncError::InvalidRecord(_)
                | SyncError::Timeout(_)
        )
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
