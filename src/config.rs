//! Orchestrator configuration (§6): `.orchestration/config.toml`, parsed
//! with `serde` + `toml`. Every field has a documented default, so a
//! missing file is equivalent to every field being absent.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Path, relative to the workspace root, of the orchestrator config file.
pub const CONFIG_PATH: &str = ".orchestration/config.toml";

const fn default_session_ttl_secs() -> u64 {
    1800
}

const fn default_snapshot_ttl_secs() -> u64 {
    300
}

const fn default_snapshot_sweep_interval_secs() -> u64 {
    60
}

const fn default_session_sweep_interval_secs() -> u64 {
    300
}

const fn default_revision_cache_ttl_secs() -> u64 {
    5
}

/// Typed view of `.orchestration/config.toml`. Unknown fields are rejected
/// so a typo in the file surfaces immediately rather than silently being
/// ignored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OrchestratorConfig {
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_snapshot_ttl_secs")]
    pub snapshot_ttl_secs: u64,
    #[serde(default = "default_snapshot_sweep_interval_secs")]
    pub snapshot_sweep_interval_secs: u64,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
    #[serde(default = "default_revision_cache_ttl_secs")]
    pub revision_cache_ttl_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: default_session_ttl_secs(),
            snapshot_ttl_secs: default_snapshot_ttl_secs(),
            snapshot_sweep_interval_secs: default_snapshot_sweep_interval_secs(),
            session_sweep_interval_secs: default_session_sweep_interval_secs(),
            revision_cache_ttl_secs: default_revision_cache_ttl_secs(),
        }
    }
}

impl OrchestratorConfig {
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    #[must_use]
    pub fn snapshot_ttl(&self) -> Duration {
        Duration::from_secs(self.snapshot_ttl_secs)
    }

    #[must_use]
    pub fn snapshot_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_sweep_interval_secs)
    }

    #[must_use]
    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }

    #[must_use]
    pub fn revision_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.revision_cache_ttl_secs)
    }
}

/// Errors loading the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}' as TOML: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Load `workspace_root`'s config file, falling back to all-defaults if it
/// does not exist.
///
/// # Errors
/// Returns [`ConfigError`] if the file exists but cannot be read or parsed.
pub fn load(workspace_root: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let full_path = workspace_root.join(CONFIG_PATH);
    let raw = match fs::read_to_string(&full_path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            return Ok(OrchestratorConfig::default())
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: CONFIG_PATH.to_owned(),
                source,
            })
        }
    };

    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: CONFIG_PATH.to_owned(),
        source,
    })
}
