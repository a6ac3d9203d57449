//! Intent Catalog (§4.6): resolves intent ids to their declared owned-scope
//! glob patterns from `.orchestration/active_intents.yaml`.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use serde::Deserialize;

/// Path, relative to the workspace root, of the intent registry file.
pub const ACTIVE_INTENTS_PATH: &str = ".orchestration/active_intents.yaml";

/// A single active intent: an id, a human-readable name, and the set of
/// glob patterns it is permitted to write within (§3).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Intent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub owned_scope: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ActiveIntentsFile {
    #[serde(default)]
    intents: Vec<Intent>,
}

/// Failures reading or parsing the intent registry.
#[derive(Debug, thiserror::Error)]
pub enum IntentCatalogError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}' as YAML: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Caches the parsed intent registry per workspace root, re-reading only
/// when explicitly invalidated (the registry changes rarely compared to
/// the write volume that consults it).
pub struct IntentCatalog {
    cache: Mutex<HashMap<std::path::PathBuf, HashMap<String, Intent>>>,
}

impl IntentCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Look up intent `id` within `workspace_root`, parsing and caching the
    /// registry file on first access for that root.
    ///
    /// # Errors
    /// Returns [`IntentCatalogError`] if the registry file exists but
    /// cannot be read or parsed. A missing registry file is not an error —
    /// it is treated as an empty intent set, so lookups simply return
    /// `Ok(None)`.
    pub fn find_by_id(
        &self,
        workspace_root: &Path,
        id: &str,
    ) -> Result<Option<Intent>, IntentCatalogError> {
        self.ensure_loaded(workspace_root)?;
        let cache = self.lock();
        Ok(cache
            .get(workspace_root)
            .and_then(|intents| intents.get(id))
            .cloned())
    }

    /// Drop the cached registry for `workspace_root`, forcing a re-read on
    /// the next lookup.
    pub fn invalidate(&self, workspace_root: &Path) {
        self.lock().remove(workspace_root);
    }

    fn ensure_loaded(&self, workspace_root: &Path) -> Result<(), IntentCatalogError> {
        if self.lock().contains_key(workspace_root) {
            return Ok(());
        }

        let full_path = workspace_root.join(ACTIVE_INTENTS_PATH);
        let intents = match fs::read_to_string(&full_path) {
            Ok(raw) => {
                let parsed: ActiveIntentsFile =
                    serde_yaml::from_str(&raw).map_err(|source| IntentCatalogError::Parse {
                        path: ACTIVE_INTENTS_PATH.to_owned(),
                        source,
                    })?;
                parsed
                    .intents
                    .into_iter()
                    .map(|intent| (intent.id.clone(), intent))
                    .collect()
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(source) => {
                return Err(IntentCatalogError::Io {
                    path: ACTIVE_INTENTS_PATH.to_owned(),
                    source,
                })
            }
        };

        self.lock().insert(workspace_root.to_path_buf(), intents);
        Ok(())
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<std::path::PathBuf, HashMap<String, Intent>>> {
        self.cache.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for IntentCatalog {
    fn default() -> Self {
        Self::new()
    }
}
