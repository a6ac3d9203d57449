//! Workspace-relative path normalisation and glob-pattern matching.
//!
//! Every public boundary in this crate stores and compares paths in this
//! normalised form: relative to the workspace root, forward slashes, no
//! leading `./`. Native separators never leak past [`normalize`].

use std::path::{Path, PathBuf};

use glob::Pattern;

/// Normalise `path` (absolute or relative, any platform separator) to a
/// workspace-relative, forward-slash string.
///
/// If `path` is absolute and not inside `workspace_root`, it is returned
/// with the root stripped as best-effort (falling back to the path as-is
/// with separators normalised) rather than failing — callers that need a
/// hard guarantee the path is inside the workspace should check themselves.
#[must_use]
pub fn normalize(path: &Path, workspace_root: &Path) -> String {
    let relative: PathBuf = if path.is_absolute() {
        path.strip_prefix(workspace_root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };

    let mut parts: Vec<&str> = Vec::new();
    for component in relative.components() {
        if let std::path::Component::Normal(part) = component {
            if let Some(s) = part.to_str() {
                parts.push(s);
            }
        }
    }
    parts.join("/")
}

/// Return `true` if the normalised form of `path` matches at least one
/// pattern in `patterns` (logical OR).
///
/// `patterns` must be non-empty; the gatekeeper treats an empty list as a
/// configuration error (`NoOwnedScope`), not a "no match" — this function
/// simply returns `false` for an empty list so callers decide how to react.
#[must_use]
pub fn matches_any(path: &Path, patterns: &[String], workspace_root: &Path) -> bool {
    if patterns.is_empty() {
        return false;
    }
    let normalised = normalize(path, workspace_root);
    patterns.iter().any(|pattern| {
        Pattern::new(pattern).is_ok_and(|compiled| compiled.matches(&normalised))
    })
}
