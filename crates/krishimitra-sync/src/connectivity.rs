//! Connectivity signal.
//!
//! [`Connectivity`] holds the current online/offline state and lets any number
//! of tasks wait for it to change. The state is set from outside: by the host
//! platform, by a user toggle, or by a [`ConnectivityProbe`] that polls the
//! remote's health endpoint.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::remote::RemoteApi;

/// Shared online/offline flag.
///
/// Cloning is cheap; all clones observe the same state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(online);
        Self { tx: Arc::new(tx) }
    }

    /// Update the state. Returns `true` if it changed.
    ///
    /// Subscribers are only woken on an actual transition.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
        if changed {
            info!("Connectivity changed: {}", if online { "online" } else { "offline" });
        }
        changed
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// A receiver that resolves `changed()` on every transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    /// Starts offline until something reports otherwise.
    fn default() -> Self {
        Self::new(false)
    }
}

/// Derives connectivity from periodic health checks.
pub struct ConnectivityProbe;

impl ConnectivityProbe {
    /// Poll `remote.health()` every `every`, marking the signal online when a
    /// check succeeds within `deadline` and offline otherwise.
    ///
    /// The first check runs immediately. The task runs until `cancel` fires.
    pub fn spawn(
        remote: Arc<dyn RemoteApi>,
        connectivity: Connectivity,
        every: Duration,
        deadline: Duration,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("Connectivity probe cancelled");
                        break;
                    }
                    _ = ticker.tick() => {
                        let online = match timeout(deadline, remote.health()).await {
                            Ok(Ok(())) => true,
                            Ok(Err(e)) => {
                                debug!("Health check failed: {}", e);
                                false
                            }
                            Err(_) => {
                                debug!("Health check timed out after {:?}", deadline);
                                false
                            }
                        };
                        connectivity.set_online(online);
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockRemote;

    #[test]
    fn test_set_online_reports_transitions() {
        let connectivity = Connectivity::default();
        assert!(!connectivity.is_online());
        assert!(connectivity.set_online(true));
        assert!(!connectivity.set_online(true));
        assert!(connectivity.is_online());
        assert!(connectivity.set_online(false));
    }

    #[tokio::test]
    async fn test_subscriber_sees_change() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();

        let clone = connectivity.clone();
        tokio::spawn(async move {
            clone.set_online(true);
        });

        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_follows_health() {
        let remote = Arc::new(MockRemote::new());
        let connectivity = Connectivity::new(false);
        let cancel = CancellationToken::new();

        let handle = ConnectivityProbe::spawn(
            remote.clone(),
            connectivity.clone(),
            Duration::from_secs(5),
            Duration::from_secs(1),
            cancel.clone(),
        );

        let mut rx = connectivity.subscribe();
        rx.changed().await.unwrap();
        assert!(connectivity.is_online());

        remote.set_unreachable(true);
        rx.changed().await.unwrap();
        assert!(!connectivity.is_online());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_treats_slow_health_as_offline() {
        let remote = Arc::new(MockRemote::new());
        remote.set_latency(Duration::from_secs(10));
        let connectivity = Connectivity::new(true);
        let cancel = CancellationToken::new();

        let handle = ConnectivityProbe::spawn(
            remote,
            connectivity.clone(),
            Duration::from_secs(30),
            Duration::from_secs(2),
            cancel.clone(),
        );

        let mut rx = connectivity.subscribe();
        rx.changed().await.unwrap();
        assert!(!connectivity.is_online());

        cancel.cancel();
        handle.await.unwrap();
    }
}
