//! Logs sync events as the service's user-facing notifications.

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use krishimitra_sync::{EventReceiver, SyncEvent};

/// Turns [`SyncEvent`]s into log lines.
///
/// Repeated sync failures are logged at `warn` three times, then once at
/// `error`, then silently until a sync succeeds again.
pub struct EventLogger {
    events: EventReceiver,
    consecutive_failures: u32,
}

impl EventLogger {
    pub fn new(events: EventReceiver) -> Self {
        Self {
            events,
            consecutive_failures: 0,
        }
    }

    /// Log events until `cancel` fires or the manager goes away.
    pub fn spawn(mut self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = self.events.recv() => match event {
                        Ok(event) => self.log(&event),
                        Err(RecvError::Lagged(skipped)) => {
                            debug!("Event logger skipped {} event(s)", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
        })
    }

    fn log(&mut self, event: &SyncEvent) {
        match event {
            SyncEvent::ConnectivityChanged { online: true } => info!("Back online"),
            SyncEvent::ConnectivityChanged { online: false } => {
                info!("Offline; changes will be queued")
            }
            SyncEvent::CycleStarted => debug!("Sync cycle started"),
            SyncEvent::CycleFinished { success } => {
                debug!("Sync cycle finished (ok: {})", success)
            }
            SyncEvent::Synced { replayed, .. } => {
                if self.consecutive_failures > 0 {
                    info!(
                        "Sync recovered after {} failed attempt(s)",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;
                if *replayed > 0 {
                    info!(
                        "Data synced successfully: {} offline change(s) uploaded",
                        replayed
                    );
                }
            }
            SyncEvent::SyncFailed { error, pending } => {
                self.consecutive_failures += 1;
                if self.consecutive_failures <= 3 {
                    warn!(
                        "Sync failed ({} pending), will retry when connection improves: {}",
                        pending, error
                    );
                } else if self.consecutive_failures == 4 {
                    error!(
                        "Sync failed {} times in a row, will keep retrying silently",
                        self.consecutive_failures
                    );
                }
            }
            SyncEvent::WeatherUpdated { snapshot } => debug!(
                "Weather: {} {} at {}",
                snapshot.temperature, snapshot.condition, snapshot.location
            ),
            SyncEvent::AdvisoryAdded { advisory } => {
                info!("New {} advisory: {}", advisory.category, advisory.title)
            }
            SyncEvent::AdvisorySuppressed { id, reason } => {
                debug!("Advisory {} held back: {:?}", id, reason)
            }
            SyncEvent::FetchFailed { error } => warn!("Failed to fetch latest data: {}", error),
            _ => debug!("Unhandled sync event: {:?}", event),
        }
    }
}
