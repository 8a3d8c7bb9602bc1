//! Wiring between configuration, store, remote and sync manager.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use krishimitra_store::Store;
use krishimitra_sync::{
    Connectivity, ConnectivityProbe, HttpRemote, RemoteApi, RemoteError, SimulatedRemote,
    SyncHandle, SyncManager,
};

use crate::config::{Config, RemoteConfig};
use crate::monitor::EventLogger;

/// Everything a running service needs.
pub struct App {
    pub config: Config,
    pub store: Arc<Store>,
    pub remote: Arc<dyn RemoteApi>,
    pub connectivity: Connectivity,
    pub manager: Arc<SyncManager>,
}

impl App {
    /// Open the store and build the sync manager described by `config`.
    ///
    /// Connectivity starts offline for a real remote (the probe decides) and
    /// online for a simulated one.
    pub fn new(config: Config) -> Result<Self, AppError> {
        info!("Opening database at {:?}", config.storage.path);
        let store = Store::open(&config.storage.path)?;
        Self::with_store(config, store)
    }

    /// Like [`App::new`] with an already opened store.
    pub fn with_store(config: Config, store: Store) -> Result<Self, AppError> {
        let store = Arc::new(store);
        let remote = build_remote(&config.remote)?;
        let connectivity = Connectivity::new(config.remote.simulate);
        let manager = Arc::new(SyncManager::new(
            Arc::clone(&store),
            Arc::clone(&remote),
            connectivity.clone(),
            config.sync_options(),
        ));

        Ok(Self {
            config,
            store,
            remote,
            connectivity,
            manager,
        })
    }

    /// Start the probe (for a real remote), the event logger and the sync
    /// loop. Everything stops when `cancel` fires.
    pub fn start(&self, cancel: CancellationToken) -> Running {
        let probe = if self.config.remote.simulate {
            info!("Using simulated remote");
            None
        } else {
            info!("Using remote at {}", self.config.remote.base_url);
            Some(ConnectivityProbe::spawn(
                Arc::clone(&self.remote),
                self.connectivity.clone(),
                self.config.connectivity.probe_interval(),
                self.config.remote.request_timeout(),
                cancel.clone(),
            ))
        };

        let logger = EventLogger::new(self.manager.subscribe()).spawn(cancel.clone());
        let sync = self.manager.start();

        Running {
            cancel,
            sync,
            probe,
            logger,
        }
    }
}

/// Handles to the background tasks of a started [`App`].
pub struct Running {
    cancel: CancellationToken,
    sync: SyncHandle,
    probe: Option<tokio::task::JoinHandle<()>>,
    logger: tokio::task::JoinHandle<()>,
}

impl Running {
    pub fn sync_now(&self) {
        self.sync.sync_now();
    }

    /// Stop every task and wait for them to exit.
    pub async fn shutdown(self) {
        self.sync.shutdown().await;
        self.cancel.cancel();
        if let Some(probe) = self.probe {
            let _ = probe.await;
        }
        let _ = self.logger.await;
    }
}

/// The remote transport selected by `config`.
pub fn build_remote(config: &RemoteConfig) -> Result<Arc<dyn RemoteApi>, AppError> {
    if config.simulate {
        return Ok(Arc::new(SimulatedRemote::default()));
    }
    let remote = HttpRemote::new(&config.base_url, config.request_timeout())?;
    Ok(Arc::new(remote))
}

/// Errors while assembling the service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to open store: {0}")]
    Store(#[from] krishimitra_store::Error),
    #[error("Failed to create remote: {0}")]
    Remote(#[from] RemoteError),
}
