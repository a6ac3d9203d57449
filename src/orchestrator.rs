//! Orchestrator facade (§4.13–4.14): owns every stateful component for one
//! workspace root, plus the two background sweepers described in §5
//! ("Periodic work"). Each workspace gets its own instance rather than a
//! process-wide singleton registry; the embedding runtime constructs one
//! per workspace and tears it down explicitly (§9 Design Notes).

use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

use crate::config::OrchestratorConfig;
use crate::intent::IntentCatalog;
use crate::ledger::LedgerWriter;
use crate::revision::RevisionProbe;
use crate::session::SessionRegistry;
use crate::snapshot::SnapshotStore;

/// A background loop that sweeps some resource on a fixed interval until
/// told to stop. `recv_timeout` naturally avoids backfilling missed ticks:
/// it only fires again once the full interval has elapsed since the
/// previous iteration finished (§4.14).
struct Sweeper {
    stop: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    fn spawn<F>(interval: std::time::Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
                Err(mpsc::RecvTimeoutError::Timeout) => tick(),
            }
        });
        Self {
            stop: stop_tx,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Owns one workspace's Snapshot Store, Session Registry, Revision Probe,
/// Intent Catalog cache, and Ledger Writer, plus the snapshot and session
/// idleness sweepers.
///
/// Construction does no I/O beyond what loading the config performs; the
/// `.orchestration/` directory is created lazily by the first component
/// that needs to write into it.
pub struct Orchestrator {
    workspace_root: PathBuf,
    config: OrchestratorConfig,
    pub snapshots: Arc<SnapshotStore>,
    pub sessions: Arc<SessionRegistry>,
    pub revisions: RevisionProbe,
    pub intents: IntentCatalog,
    pub ledger: LedgerWriter,
    snapshot_sweeper: Sweeper,
    session_sweeper: Sweeper,
}

impl Orchestrator {
    /// Build an orchestrator for `workspace_root` using `config`, starting
    /// both background sweepers immediately.
    #[must_use]
    pub fn new(workspace_root: &Path, config: OrchestratorConfig) -> Self {
        let snapshots = Arc::new(SnapshotStore::new());
        let sessions = Arc::new(SessionRegistry::new());
        let revisions = RevisionProbe::with_ttl(config.revision_cache_ttl());
        let intents = IntentCatalog::new();
        let ledger = LedgerWriter::new();

        let snapshot_sweeper = {
            let snapshots = Arc::clone(&snapshots);
            let ttl = config.snapshot_ttl();
            Sweeper::spawn(config.snapshot_sweep_interval(), move || snapshots.sweep(ttl))
        };
        let session_sweeper = {
            let sessions = Arc::clone(&sessions);
            let ttl = config.session_ttl();
            Sweeper::spawn(config.session_sweep_interval(), move || sessions.sweep(ttl))
        };

        Self {
            workspace_root: workspace_root.to_path_buf(),
            config,
            snapshots,
            sessions,
            revisions,
            intents,
            ledger,
            snapshot_sweeper,
            session_sweeper,
        }
    }

    /// Load config from `workspace_root` (falling back to defaults if
    /// absent) and build an orchestrator for it.
    ///
    /// # Errors
    /// Returns a [`crate::config::ConfigError`] if the config file exists
    /// but cannot be parsed.
    pub fn from_workspace(workspace_root: &Path) -> Result<Self, crate::config::ConfigError> {
        let config = crate::config::load(workspace_root)?;
        Ok(Self::new(workspace_root, config))
    }

    #[must_use]
    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Stop both sweepers deterministically. Idempotent; also run
    /// implicitly on drop.
    pub fn shutdown(&mut self) {
        self.snapshot_sweeper.stop();
        self.session_sweeper.stop();
    }
}
