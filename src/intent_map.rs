//! Intent Map Writer (§4.9): maintains `.orchestration/intent_map.md`, a
//! markdown-as-data-store reverse index from intent id to the workspace
//! paths it has touched.
//!
//! File shape (§6):
//! ```markdown
//! # Intent Map
//!
//! Maps each active intent to the workspace files it has touched.
//!
//! ## INT-001: Add login flow
//!
//! - src/auth/login.ts
//! - src/auth/session.ts
//!
//! ## INT-002: Fix pagination bug
//!
//! *No files mapped yet*
//! ```
//! Sections are kept in ascending intent-id order and bullets in ascending
//! path order on every write, so the file diffs cleanly under VCS.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Path, relative to the workspace root, of the intent map file.
pub const INTENT_MAP_PATH: &str = ".orchestration/intent_map.md";

/// Fixed H1 header plus blurb line (§6) prepended to every rendering of the
/// map, regardless of how many intents it currently lists.
const HEADER: &str = "# Intent Map\n\nMaps each active intent to the workspace files it has touched.\n\n";

/// Failures reading or writing the intent map.
#[derive(Debug, thiserror::Error)]
pub enum IntentMapError {
    #[error("failed to create '.orchestration' directory: {0}")]
    CreateDir(#[source] std::io::Error),

    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

struct Section {
    name: Option<String>,
    paths: BTreeSet<String>,
}

/// Record that `intent_id` (named `intent_name` the first time it is seen)
/// has touched `path`. Creates `.orchestration/intent_map.md` if absent,
/// creates the intent's section if absent, and is idempotent — recording
/// the same `(intent_id, path)` pair twice leaves the file unchanged.
///
/// # Errors
/// Returns [`IntentMapError`] if the directory or file cannot be read or
/// written.
pub fn upsert(
    workspace_root: &Path,
    intent_id: &str,
    path: &str,
    intent_name: Option<&str>,
) -> Result<(), IntentMapError> {
    let mut sections = read_sections(workspace_root)?;

    let section = sections
        .entry(intent_id.to_owned())
        .or_insert_with(|| Section {
            name: intent_name.map(str::to_owned),
            paths: BTreeSet::new(),
        });
    if let Some(name) = intent_name {
        section.name = Some(name.to_owned());
    }
    section.paths.insert(path.to_owned());

    write_sections(workspace_root, &sections)
}

/// Remove `path` from `intent_id`'s section. Drops the section entirely if
/// it becomes empty. A no-op if the map file does not exist, the intent
/// has no section, or the path was never recorded under it.
///
/// # Errors
/// Returns [`IntentMapError`] if the file cannot be read or written.
pub fn remove(workspace_root: &Path, intent_id: &str, path: &str) -> Result<(), IntentMapError> {
    let mut sections = read_sections(workspace_root)?;

    let Some(section) = sections.get_mut(intent_id) else {
        return Ok(());
    };
    section.paths.remove(path);
    if section.paths.is_empty() {
        sections.remove(intent_id);
    }

    write_sections(workspace_root, &sections)
}

fn read_sections(workspace_root: &Path) -> Result<BTreeMap<String, Section>, IntentMapError> {
    let full_path = workspace_root.join(INTENT_MAP_PATH);
    let raw = match fs::read_to_string(&full_path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(source) => {
            return Err(IntentMapError::Read {
                path: INTENT_MAP_PATH.to_owned(),
                source,
            })
        }
    };

    Ok(parse(&raw))
}

fn parse(raw: &str) -> BTreeMap<String, Section> {
    let mut sections = BTreeMap::new();
    let mut current_id: Option<String> = None;

    for line in raw.lines() {
        if let Some(header) = line.strip_prefix("## ") {
            let (id, name) = match header.split_once(": ") {
                Some((id, name)) => (id, Some(name.to_owned())),
                None => (header, None),
            };
            sections.insert(
                id.to_owned(),
                Section {
                    name,
                    paths: BTreeSet::new(),
                },
            );
            current_id = Some(id.to_owned());
        } else if let Some(path) = line.strip_prefix("- ") {
            if let Some(id) = &current_id {
                if let Some(section) = sections.get_mut(id) {
                    section.paths.insert(path.to_owned());
                }
            }
        }
    }

    sections
}

fn write_sections(
    workspace_root: &Path,
    sections: &BTreeMap<String, Section>,
) -> Result<(), IntentMapError> {
    let orchestration_dir = workspace_root.join(".orchestration");
    fs::create_dir_all(&orchestration_dir).map_err(IntentMapError::CreateDir)?;

    let mut rendered = String::from(HEADER);
    for (id, section) in sections {
        match &section.name {
            Some(name) => rendered.push_str(&format!("## {id}: {name}\n\n")),
            None => rendered.push_str(&format!("## {id}\n\n")),
        }
        if section.paths.is_empty() {
            rendered.push_str("*No files mapped yet*\n\n");
        } else {
            for path in &section.paths {
                rendered.push_str(&format!("- {path}\n"));
            }
            rendered.push('\n');
        }
    }

    let full_path = workspace_root.join(INTENT_MAP_PATH);
    fs::write(&full_path, rendered).map_err(|source| IntentMapError::Write {
        path: INTENT_MAP_PATH.to_owned(),
        source,
    })
}
