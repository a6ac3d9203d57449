//! The traceability ledger's data model (§3): [`TraceEntry`] and the types
//! nested inside it, plus the schema validation the Ledger Writer (C8)
//! enforces at its boundary.

use serde::{Deserialize, Serialize};

use crate::classify::MutationClass;

/// Who authored a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Ai,
    Human,
}

/// The kind of external reference a conversation is related to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedType {
    Specification,
    Requirement,
    Issue,
    Task,
}

/// A single line-range hash within one file, one conversation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start_line: usize,
    pub end_line: usize,
    pub content_hash: String,
}

/// A reference from a conversation to external tracking (a spec, a task, …).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Related {
    #[serde(rename = "type")]
    pub kind: RelatedType,
    pub value: String,
}

/// The entity that contributed a conversation turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub entity_type: EntityType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_identifier: Option<String>,
}

/// A single conversation that touched one file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub url: String,
    pub contributor: Contributor,
    pub ranges: Vec<Range>,
    pub related: Vec<Related>,
}

/// One file touched by a trace entry, with the conversations that touched it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relative_path: String,
    pub conversations: Vec<Conversation>,
}

/// An append-only traceability ledger row (§3).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub id: String,
    pub timestamp: String,
    pub vcs: VcsInfo,
    pub files: Vec<FileEntry>,
    pub mutation_class: MutationClass,
}

/// VCS provenance for a trace entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VcsInfo {
    pub revision_id: String,
}

/// Why a [`TraceEntry`] failed schema validation (§4.8, §7 `InvalidEntry`).
///
/// This error is raised only to the Post-Write Recorder, which wraps it in
/// its outer swallow-and-log boundary — it must never escape to the tool
/// layer (§7 Propagation policy).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("trace entry has no files (files must be non-empty)")]
    EmptyFiles,

    #[error("file '{relative_path}' has no conversations (conversations must be non-empty)")]
    EmptyConversations { relative_path: String },

    #[error("file '{relative_path}' conversation has no ranges (ranges must be non-empty)")]
    EmptyRanges { relative_path: String },

    #[error(
        "file '{relative_path}' range has start_line {start_line}, must be >= 1"
    )]
    StartLineBelowOne {
        relative_path: String,
        start_line: usize,
    },

    #[error(
        "file '{relative_path}' range has end_line {end_line} < start_line {start_line}"
    )]
    EndLineBeforeStartLine {
        relative_path: String,
        start_line: usize,
        end_line: usize,
    },

    #[error(
        "file '{relative_path}' range content_hash '{content_hash}' does not match the required `sha256:<64 hex>` shape"
    )]
    MalformedContentHash {
        relative_path: String,
        content_hash: String,
    },

    #[error(
        "file '{relative_path}' range content_hash does not match the hash of the referenced content"
    )]
    ContentHashMismatch { relative_path: String },
}

/// Validate the shape-only invariants of a [`TraceEntry`] (§3, §8):
/// non-empty `files`/`conversations`/`ranges`, `start_line >= 1`,
/// `end_line >= start_line`, and `content_hash` matching `sha256:<64 hex>`.
///
/// This does not (and cannot, without the original content) verify that
/// `content_hash` is the *correct* hash of the range it names — that
/// invariant is the caller's responsibility to establish before building
/// the entry (the Post-Write Recorder computes the hash itself).
pub fn validate_shape(entry: &TraceEntry) -> Result<(), ValidationError> {
    if entry.files.is_empty() {
        return Err(ValidationError::EmptyFiles);
    }
    for file in &entry.files {
        if file.conversations.is_empty() {
            return Err(ValidationError::EmptyConversations {
                relative_path: file.relative_path.clone(),
            });
        }
        for conversation in &file.conversations {
            if conversation.ranges.is_empty() {
                return Err(ValidationError::EmptyRanges {
                    relative_path: file.relative_path.clone(),
                });
            }
            for range in &conversation.ranges {
                if range.start_line < 1 {
                    return Err(ValidationError::StartLineBelowOne {
                        relative_path: file.relative_path.clone(),
                        start_line: range.start_line,
                    });
                }
                if range.end_line < range.start_line {
                    return Err(ValidationError::EndLineBeforeStartLine {
                        relative_path: file.relative_path.clone(),
                        start_line: range.start_line,
                        end_line: range.end_line,
                    });
                }
                if !is_well_formed_content_hash(&range.content_hash) {
                    return Err(ValidationError::MalformedContentHash {
                        relative_path: file.relative_path.clone(),
                        content_hash: range.content_hash.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// `true` if `hash` is exactly the literal prefix `sha256:` followed by 64
/// lowercase hex characters.
#[must_use]
pub fn is_well_formed_content_hash(hash: &str) -> bool {
    hash.strip_prefix("sha256:").is_some_and(|rest| {
        rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    })
}
