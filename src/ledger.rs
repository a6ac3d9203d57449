//! Ledger Writer (§4.8): append-only persistence for [`TraceEntry`] rows to
//! `.orchestration/agent_trace.jsonl`, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use crate::trace::{self, TraceEntry, ValidationError};

/// Path, relative to the workspace root, of the append-only ledger file.
pub const TRACE_LEDGER_PATH: &str = ".orchestration/agent_trace.jsonl";

/// Failures writing to or reading from the ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("trace entry failed schema validation: {0}")]
    InvalidEntry(#[from] ValidationError),

    #[error("failed to create '.orchestration' directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("failed to append to '{path}': {source}")]
    Append {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize trace entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Appends validated [`TraceEntry`] rows to a workspace's ledger file,
/// serializing concurrent writers with a single in-process lock. One
/// instance is owned per workspace by [`crate::Orchestrator`] (§9 Design
/// Notes), so this lock already scopes to one workspace root; it does not
/// need to be keyed.
pub struct LedgerWriter {
    write_lock: Mutex<()>,
}

impl LedgerWriter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            write_lock: Mutex::new(()),
        }
    }

    /// Validate `entry`'s shape and append it as a single JSON line to
    /// `workspace_root`'s ledger, creating `.orchestration/` if needed.
    ///
    /// # Errors
    /// Returns [`LedgerError::InvalidEntry`] if `entry` fails
    /// [`trace::validate_shape`], or an I/O variant if the directory or
    /// file cannot be written.
    pub fn append(&self, workspace_root: &Path, entry: &TraceEntry) -> Result<(), LedgerError> {
        trace::validate_shape(entry)?;

        let orchestration_dir = workspace_root.join(".orchestration");
        fs::create_dir_all(&orchestration_dir).map_err(LedgerError::CreateDir)?;

        let line = serde_json::to_string(entry)?;
        let full_path = workspace_root.join(TRACE_LEDGER_PATH);

        let _guard = self.write_lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&full_path)
            .map_err(|source| LedgerError::Append {
                path: TRACE_LEDGER_PATH.to_owned(),
                source,
            })?;
        writeln!(file, "{line}").map_err(|source| LedgerError::Append {
            path: TRACE_LEDGER_PATH.to_owned(),
            source,
        })
    }

    /// Read every well-formed entry from `workspace_root`'s ledger, in
    /// append order. Lines that fail to parse as JSON or fail schema
    /// validation are skipped with a warning rather than aborting the
    /// read — a single corrupt row must not hide the rest of the history.
    #[must_use]
    pub fn read(&self, workspace_root: &Path) -> Vec<TraceEntry> {
        let full_path = workspace_root.join(TRACE_LEDGER_PATH);
        let Ok(raw) = fs::read_to_string(&full_path) else {
            return Vec::new();
        };

        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<TraceEntry>(line) {
                Ok(entry) => match trace::validate_shape(&entry) {
                    Ok(()) => Some(entry),
                    Err(err) => {
                        tracing::warn!(error = %err, "skipping ledger entry that failed validation");
                        None
                    }
                },
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unparseable ledger line");
                    None
                }
            })
            .collect()
    }

}

impl Default for LedgerWriter {
    fn default() -> Self {
        Self::new()
    }
}
