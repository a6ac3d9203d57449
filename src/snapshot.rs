//! Per-file optimistic concurrency snapshots (§4.3).
//!
//! A snapshot is a baseline: "holder last saw this content at this digest."
//! `verify` re-reads the file and compares; it never refreshes the stored
//! digest on success, so a later `verify` within the same session still
//! detects an intervening external mutation (§4.3 Ordering guarantees).

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::hash;

/// The default snapshot TTL before the age sweeper evicts it (5 minutes, §3).
pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(5 * 60);

/// Errors from disk-touching snapshot operations.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to read '{path}' for snapshot capture: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
struct Entry {
    digest: String,
    captured_at: Instant,
}

/// Optimistic-concurrency snapshot store: `(path, holder) -> digest`.
///
/// One instance is owned per workspace. Time is read from a single clock
/// source so tests can exercise TTL sweeping without real sleeps (by
/// constructing snapshots directly rather than via a wall clock override —
/// see the `sweep` tests below, which use short TTLs against real elapsed
/// time instead of a mock clock, favoring real-filesystem integration
/// tests over clock injection).
pub struct SnapshotStore {
    entries: Mutex<HashMap<(String, String), Entry>>,
}

impl SnapshotStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record the digest of `content` under `(path, holder)`, refreshing
    /// the holder's timestamp. Overwrites any existing entry for the pair.
    pub fn capture(&self, path: &str, content: &str, holder: &str) {
        let digest = hash::digest(content);
        let mut entries = self.lock();
        entries.insert(
            (path.to_owned(), holder.to_owned()),
            Entry {
                digest,
                captured_at: Instant::now(),
            },
        );
    }

    /// Read `path` from disk under `workspace_root` and `capture` it.
    ///
    /// # Errors
    /// Returns [`SnapshotError::Io`] if the file cannot be read (e.g. it
    /// does not exist). Callers on the read pre-hook path are expected to
    /// swallow this per §7.
    pub fn capture_from_disk(
        &self,
        workspace_root: &Path,
        path: &str,
        holder: &str,
    ) -> Result<(), SnapshotError> {
        let content = read_to_string(workspace_root, path)?;
        self.capture(path, &content, holder);
        Ok(())
    }

    /// Re-read `path` from disk and compare against the stored baseline for
    /// `(path, holder)`.
    ///
    /// Returns `true` if there is no snapshot for the pair (no prior read
    /// implies no stale contract), or if the current on-disk content still
    /// hashes to the stored digest. Returns `false` if the digests differ
    /// or the file cannot be read (an I/O failure here is treated as stale,
    /// §4.3 Failure modes).
    #[must_use]
    pub fn verify(&self, workspace_root: &Path, path: &str, holder: &str) -> bool {
        let expected = {
            let entries = self.lock();
            match entries.get(&(path.to_owned(), holder.to_owned())) {
                Some(entry) => entry.digest.clone(),
                None => return true,
            }
        };

        match read_to_string(workspace_root, path) {
            Ok(content) => hash::digest(&content) == expected,
            Err(_) => false,
        }
    }

    /// Remove the snapshot for `(path, holder)` only if it belongs to
    /// `holder` (a no-op if absent — the key already scopes ownership).
    pub fn release(&self, path: &str, holder: &str) {
        self.lock().remove(&(path.to_owned(), holder.to_owned()));
    }

    /// Remove every snapshot held by `holder` (session teardown).
    pub fn release_all(&self, holder: &str) {
        let mut entries = self.lock();
        entries.retain(|(_, entry_holder), _| entry_holder != holder);
    }

    /// Remove snapshots captured longer than `max_age` ago.
    pub fn sweep(&self, max_age: Duration) {
        let mut entries = self.lock();
        entries.retain(|_, entry| entry.captured_at.elapsed() < max_age);
    }

    /// Number of tracked snapshots (test/introspection helper).
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<(String, String), Entry>> {
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read_to_string(workspace_root: &Path, path: &str) -> Result<String, SnapshotError> {
    let full_path = workspace_root.join(path);
    fs::read_to_string(&full_path).map_err(|source| SnapshotError::Io {
        path: path.to_owned(),
        source,
    })
}
