//! Current VCS revision resolution with a short-lived, per-workspace cache
//! (§4.2).
//!
//! The probe never raises: every failure class (not a repository, the `git`
//! binary missing, a permission error, a non-zero exit) collapses to the
//! literal string `"unknown"`. Shelling out to a plumbing command
//! (`rev-parse HEAD`) and treating its failure as routine rather than
//! exceptional keeps the result infallible for callers that must never
//! block a write on VCS flakiness.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(5);

struct CacheEntry {
    revision_id: String,
    fetched_at: Instant,
}

/// Resolves and caches the current VCS revision id per workspace root.
///
/// One instance should be owned by the [`crate::Orchestrator`] for a given
/// process; separate instances (as in tests) have independent caches.
pub struct RevisionProbe {
    ttl: Duration,
    cache: Mutex<HashMap<PathBuf, CacheEntry>>,
}

impl RevisionProbe {
    /// Create a probe with the default 5-second cache TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a probe with a custom cache TTL (used by tests to avoid
    /// sleeping for the default 5s).
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the current revision id for `workspace_root`, or `"unknown"`
    /// if it cannot be determined. Cached for `ttl` per workspace root to
    /// avoid repeated subprocess spawns under burst load.
    #[must_use]
    #[tracing::instrument(skip(self), fields(workspace_root = %workspace_root.display()))]
    pub fn current_revision(&self, workspace_root: &Path) -> String {
        let key = workspace_root.to_path_buf();

        {
            let cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if let Some(entry) = cache.get(&key) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return entry.revision_id.clone();
                }
            }
        }

        let revision_id = spawn_rev_parse_head(workspace_root).unwrap_or_else(|| {
            tracing::warn!("could not resolve VCS revision; falling back to \"unknown\"");
            "unknown".to_owned()
        });

        let mut cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.insert(
            key,
            CacheEntry {
                revision_id: revision_id.clone(),
                fetched_at: Instant::now(),
            },
        );
        revision_id
    }

    /// Clear the cached entry for `workspace_root`, forcing the next call to
    /// `current_revision` to re-spawn the VCS probe.
    pub fn invalidate(&self, workspace_root: &Path) {
        let mut cache = self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        cache.remove(workspace_root);
    }
}

impl Default for RevisionProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `git rev-parse HEAD` in `workspace_root`, returning `None` on any
/// failure (spawn failure, non-zero exit, non-UTF8 output, not 40 hex
/// chars). Swallowing happens here so the caller only ever sees
/// "resolved" or "unknown".
fn spawn_rev_parse_head(workspace_root: &Path) -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(workspace_root)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let trimmed = raw.trim();
    let is_valid_oid =
        trimmed.len() == 40 && trimmed.chars().all(|c| c.is_ascii_hexdigit());
    is_valid_oid.then(|| trimmed.to_owned())
}
