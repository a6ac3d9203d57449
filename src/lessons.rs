//! Lessons Store (§4.12): an append-only, markdown-as-data-store log of
//! durable observations ("don't do X", "Y works well here"), deduplicated
//! against a recent window so agents don't pile up the same note.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Path, relative to the workspace root, of the lessons log.
pub const LESSONS_PATH: &str = ".orchestration/CLAUDE.md";

/// Fixed header (§6) written once, when the log is first created.
const HEADER: &str = "# Lessons\n\nDurable notes captured by agents working in this workspace.\n\n";

/// How many of the most recently recorded sections are checked for a
/// substring match before a new lesson is accepted (§4.12 Dedup window).
pub const DEDUP_WINDOW: usize = 5;

/// The closed set of categories a lesson may be filed under (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LessonCategory {
    Architecture,
    Testing,
    Linter,
    Build,
    UserFeedback,
    Style,
    Performance,
    Security,
    General,
}

impl LessonCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "ARCHITECTURE",
            Self::Testing => "TESTING",
            Self::Linter => "LINTER",
            Self::Build => "BUILD",
            Self::UserFeedback => "USER_FEEDBACK",
            Self::Style => "STYLE",
            Self::Performance => "PERFORMANCE",
            Self::Security => "SECURITY",
            Self::General => "GENERAL",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "ARCHITECTURE" => Some(Self::Architecture),
            "TESTING" => Some(Self::Testing),
            "LINTER" => Some(Self::Linter),
            "BUILD" => Some(Self::Build),
            "USER_FEEDBACK" => Some(Self::UserFeedback),
            "STYLE" => Some(Self::Style),
            "PERFORMANCE" => Some(Self::Performance),
            "SECURITY" => Some(Self::Security),
            "GENERAL" => Some(Self::General),
            _ => None,
        }
    }
}

/// A single recorded lesson.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lesson {
    pub category: LessonCategory,
    pub timestamp: String,
    pub body: String,
}

/// Failures reading or writing the lessons log.
#[derive(Debug, thiserror::Error)]
pub enum LessonsError {
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

/// Append a lesson under `category` with body text `body`, unless `body`
/// (trimmed) occurs as a substring of any of the last [`DEDUP_WINDOW`]
/// sections in the log (§4.12 Dedup — a substring check over raw section
/// text, not an equality check over parsed bodies). Returns `true` if the
/// lesson was appended, `false` if it was a duplicate and skipped.
///
/// # Errors
/// Returns [`LessonsError`] if the log cannot be read or written.
pub fn record(
    workspace_root: &Path,
    category: LessonCategory,
    body: &str,
) -> Result<bool, LessonsError> {
    let full_path = workspace_root.join(LESSONS_PATH);
    let existing = match fs::read_to_string(&full_path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => {
            return Err(LessonsError::Read {
                path: LESSONS_PATH.to_owned(),
                source,
            })
        }
    };

    let trimmed_body = body.trim();
    let in_recent_window = raw_sections(&existing)
        .into_iter()
        .rev()
        .take(DEDUP_WINDOW)
        .any(|section| section.contains(trimmed_body));
    if in_recent_window {
        return Ok(false);
    }

    let orchestration_dir = workspace_root.join(".orchestration");
    fs::create_dir_all(&orchestration_dir).map_err(LessonsError::CreateDir)?;

    let entry = render(category, &timestamp::now_minute(), body);
    let mut rendered = existing;
    if rendered.is_empty() {
        rendered.push_str(HEADER);
    } else if !rendered.ends_with('\n') {
        rendered.push('\n');
    }
    rendered.push_str(&entry);

    fs::write(&full_path, rendered).map_err(|source| LessonsError::Write {
        path: LESSONS_PATH.to_owned(),
        source,
    })?;
    Ok(true)
}

fn render(category: LessonCategory, timestamp: &str, body: &str) -> String {
    format!("## [{}] {timestamp}\n{body}\n\n---\n\n", category.as_str())
}

/// Split the document body (header stripped) into raw section texts, one
/// per recorded lesson, in append order. Unlike [`parse`], this returns
/// the untouched section text rather than a parsed [`Lesson`] — used by
/// the dedup check, which matches against raw text per §4.12.
fn raw_sections(raw: &str) -> Vec<&str> {
    let body = raw.strip_prefix(HEADER).unwrap_or(raw);
    body.split("\n---\n")
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .collect()
}

/// Return every lesson recorded in `workspace_root`'s log, in append order.
/// An absent log file is treated as empty, not an error.
///
/// # Errors
/// Returns [`LessonsError`] if the log exists but cannot be read.
pub fn list(workspace_root: &Path) -> Result<Vec<Lesson>, LessonsError> {
    let full_path = workspace_root.join(LESSONS_PATH);
    let raw = match fs::read_to_string(&full_path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LessonsError::Read {
                path: LESSONS_PATH.to_owned(),
                source,
            })
        }
    };
    Ok(parse(&raw))
}

/// Return only the lessons filed under `category`, in append order.
///
/// # Errors
/// Returns [`LessonsError`] if the log exists but cannot be read.
pub fn list_by_category(
    workspace_root: &Path,
    category: LessonCategory,
) -> Result<Vec<Lesson>, LessonsError> {
    Ok(list(workspace_root)?
        .into_iter()
        .filter(|lesson| lesson.category == category)
        .collect())
}

/// Search every lesson for `keywords` (case-insensitive), scored by the
/// number of distinct keywords matched in the body, descending. Lessons
/// matching no keyword are excluded.
///
/// # Errors
/// Returns [`LessonsError`] if the log exists but cannot be read.
pub fn search(workspace_root: &Path, keywords: &[&str]) -> Result<Vec<Lesson>, LessonsError> {
    let lowered_keywords: Vec<String> = keywords.iter().map(|kw| kw.to_lowercase()).collect();
    let mut scored: Vec<(usize, Lesson)> = list(workspace_root)?
        .into_iter()
        .filter_map(|lesson| {
            let lowered_body = lesson.body.to_lowercase();
            let score = lowered_keywords
                .iter()
                .filter(|kw| lowered_body.contains(kw.as_str()))
                .count();
            (score > 0).then_some((score, lesson))
        })
        .collect();
    scored.sort_by(|(score_a, _), (score_b, _)| score_b.cmp(score_a));
    Ok(scored.into_iter().map(|(_, lesson)| lesson).collect())
}

fn parse(raw: &str) -> Vec<Lesson> {
    let mut lessons = Vec::new();

    for block in raw_sections(raw) {
        let Some(rest) = block.strip_prefix("## [") else {
            continue;
        };
        let Some((category_raw, rest)) = rest.split_once("] ") else {
            continue;
        };
        let Some((timestamp, body)) = rest.split_once('\n') else {
            continue;
        };
        let Some(category) = LessonCategory::parse(category_raw) else {
            continue;
        };
        lessons.push(Lesson {
            category,
            timestamp: timestamp.to_owned(),
            body: body.trim().to_owned(),
        });
    }

    lessons
}
