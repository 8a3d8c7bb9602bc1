//! Sync event system.
//!
//! The sync manager reports progress through a broadcast channel so a UI can
//! show notifications ("Data synced successfully", "Sync failed") without
//! polling the store.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use krishimitra_types::{Advisory, Timestamp, WeatherSnapshot};

/// Events emitted by the sync manager.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SyncEvent {
    /// Connectivity flipped.
    ConnectivityChanged { online: bool },
    /// A sync cycle began.
    CycleStarted,
    /// A sync cycle ended. `success` is false if either phase failed.
    CycleFinished { success: bool },
    /// The pending queue was replayed and cleared.
    Synced { replayed: usize, at: Timestamp },
    /// Draining the queue failed; the queue is unchanged.
    SyncFailed { error: String, pending: usize },
    /// A fresh weather snapshot was stored.
    WeatherUpdated { snapshot: WeatherSnapshot },
    /// A new advisory was stored.
    AdvisoryAdded { advisory: Advisory },
    /// A fetched advisory was not stored.
    AdvisorySuppressed { id: String, reason: SuppressReason },
    /// Fetching weather or advisories failed.
    FetchFailed { error: String },
}

/// Why a fetched advisory was not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SuppressReason {
    /// An advisory with the same id is already stored.
    Duplicate,
    /// Too many advisories arrived within the rate-limit window.
    RateLimited,
    /// The advisory failed validation.
    Invalid,
}

/// Sender for sync events.
pub type EventSender = broadcast::Sender<SyncEvent>;

/// Receiver for sync events.
pub type EventReceiver = broadcast::Receiver<SyncEvent>;

/// Fans sync events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn send(&self, event: SyncEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = SyncEvent::AdvisorySuppressed {
            id: "advisory_1".to_string(),
            reason: SuppressReason::RateLimited,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "advisory_suppressed");
        assert_eq!(json["reason"], "rate_limited");
    }

    #[tokio::test]
    async fn test_dispatcher_fan_out() {
        let dispatcher = EventDispatcher::default();
        let mut a = dispatcher.subscribe();
        let mut b = dispatcher.subscribe();
        assert_eq!(dispatcher.receiver_count(), 2);

        dispatcher.send(SyncEvent::CycleStarted);
        assert!(matches!(a.recv().await.unwrap(), SyncEvent::CycleStarted));
        assert!(matches!(b.recv().await.unwrap(), SyncEvent::CycleStarted));
    }

    #[test]
    fn test_send_without_receivers() {
        EventDispatcher::new(4).send(SyncEvent::CycleStarted);
    }
}
