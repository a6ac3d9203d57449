//! Heuristic mutation classification (§4.7).
//!
//! The rule ordering here is a contract, not a suggestion (§9 Design Notes:
//! "keep the heuristic as a pure function with the rule ordering of §4.7
//! frozen"). A pure rename in a large file can legitimately cross the 20%
//! size-delta threshold and be classified `IntentEvolution` — that is
//! documented behaviour (§9 Open Question 2), not a bug to "fix" here.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The heuristic category of a write, fed into the traceability ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationClass {
    /// A structural change that preserves behaviour (the default guess).
    AstRefactor,
    /// A change large enough relative to file size to suggest new intent.
    IntentEvolution,
    /// A change whose diff vocabulary suggests a defect fix.
    BugFix,
    /// Old and new content are equal, or differ only in comments.
    Documentation,
}

impl MutationClass {
    /// Parse a mutation class from its explicit tool-arg name, if valid.
    ///
    /// Accepts the same spelling as [`MutationClass`]'s serde representation
    /// (`AST_REFACTOR`, `INTENT_EVOLUTION`, `BUG_FIX`, `DOCUMENTATION`),
    /// case-sensitively — this mirrors how the tool layer is expected to
    /// pass through one of the four canonical names.
    #[must_use]
    pub fn parse_explicit(name: &str) -> Option<Self> {
        match name {
            "AST_REFACTOR" => Some(Self::AstRefactor),
            "INTENT_EVOLUTION" => Some(Self::IntentEvolution),
            "BUG_FIX" => Some(Self::BugFix),
            "DOCUMENTATION" => Some(Self::Documentation),
            _ => None,
        }
    }
}

static BUG_FIX_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?i)fix(e[ds])?|bug|issue|repair|patch").expect("static regex is valid"),
        Regex::new(r"(?i)undefined|null|error|exception|crash").expect("static regex is valid"),
        Regex::new(r"(?i)should|expected|actual|assert").expect("static regex is valid"),
    ]
});

/// Strip `//` and `/* ... */` line/block comments, and doc-block `*`
/// continuation prefixes, from `text`. Used only to detect comment-only
/// changes (step 2 of §4.7); this is intentionally not a real tokenizer.
fn strip_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_block = false;
    while let Some(c) = chars.next() {
        if in_block {
            if c == '*' && chars.peek() == Some(&'/') {
                chars.next();
                in_block = false;
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'/') {
            // Line comment: consume through end of line.
            for next in chars.by_ref() {
                if next == '\n' {
                    out.push('\n');
                    break;
                }
            }
            continue;
        }
        if c == '/' && chars.peek() == Some(&'*') {
            chars.next();
            in_block = true;
            continue;
        }
        out.push(c);
    }
    // Drop leading '*' doc-block continuation prefixes on each line.
    out.lines()
        .map(|line| line.trim_start().trim_start_matches('*').trim_start())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build a multiset (value -> count) of non-empty, trimmed lines.
fn line_multiset(text: &str) -> HashMap<&str, usize> {
    let mut counts = HashMap::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            *counts.entry(trimmed).or_insert(0usize) += 1;
        }
    }
    counts
}

/// Lines present in `new` more times than in `old` (added), and lines
/// present in `old` more times than in `new` (removed), ignoring order.
fn added_and_removed_lines<'a>(old: &'a str, new: &'a str) -> (Vec<&'a str>, Vec<&'a str>) {
    let old_counts = line_multiset(old);
    let new_counts = line_multiset(new);

    let mut added = Vec::new();
    for (&line, &new_count) in &new_counts {
        let old_count = old_counts.get(line).copied().unwrap_or(0);
        if new_count > old_count {
            added.extend(std::iter::repeat_n(line, new_count - old_count));
        }
    }

    let mut removed = Vec::new();
    for (&line, &old_count) in &old_counts {
        let new_count = new_counts.get(line).copied().unwrap_or(0);
        if old_count > new_count {
            removed.extend(std::iter::repeat_n(line, old_count - new_count));
        }
    }

    (added, removed)
}

/// Classify a pre/post content pair using the layered heuristics of §4.7,
/// in this exact order:
///
/// 1. Identical content → `Documentation`.
/// 2. Comment-stripped content identical (but raw content differs) →
///    `Documentation`.
/// 3. Added/removed line diff matches a bug-fix vocabulary regex →
///    `BugFix`.
/// 4. Size delta exceeds 20% of the old length → `IntentEvolution`.
/// 5. Otherwise → `AstRefactor`.
#[must_use]
pub fn classify(old: &str, new: &str) -> MutationClass {
    if old == new {
        return MutationClass::Documentation;
    }

    if strip_comments(old) == strip_comments(new) {
        return MutationClass::Documentation;
    }

    let (added, removed) = added_and_removed_lines(old, new);
    let diff = format!("+{}\n-{}", added.join("\n"), removed.join("\n"));
    if BUG_FIX_PATTERNS.iter().any(|re| re.is_match(&diff)) {
        return MutationClass::BugFix;
    }

    let old_len = old.len();
    let new_len = new.len();
    let delta = old_len.abs_diff(new_len);
    let denom = old_len.max(1) as f64;
    if (delta as f64) / denom > 0.20 {
        return MutationClass::IntentEvolution;
    }

    MutationClass::AstRefactor
}

/// Resolve the mutation class for a write: prefer an explicit, validly
/// named class from tool args; otherwise classify the content pair.
#[must_use]
pub fn resolve(explicit: Option<&str>, old: &str, new: &str) -> MutationClass {
    explicit
        .and_then(MutationClass::parse_explicit)
        .unwrap_or_else(|| classify(old, new))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_is_documentation() {
        assert_eq!(classify("same", "same"), MutationClass::Documentation);
    }

    #[test]
    fn comment_only_change_is_documentation() {
        let old = "function foo(){return 1;}";
        let new = "/**doc*/\nfunction foo(){return 1;}";
        assert_eq!(classify(old, new), MutationClass::Documentation);
    }

    #[test]
    fn bug_fix_vocabulary_wins_over_size_delta() {
        let old = "x = compute();";
        let new = "// fix: handle undefined case\nif (x === undefined) { x = compute(); }";
        assert_eq!(classify(old, new), MutationClass::BugFix);
    }

    #[test]
    fn large_size_delta_without_bug_vocabulary_is_intent_evolution() {
        let old = "a";
        let new = "a".repeat(100);
        assert_eq!(classify(old, &new), MutationClass::IntentEvolution);
    }

    #[test]
    fn small_change_is_ast_refactor() {
        let old = "let x = 1;\nlet y = 2;";
        let new = "let x = 1;\nlet z = 2;";
        assert_eq!(classify(old, new), MutationClass::AstRefactor);
    }

    #[test]
    fn classify_is_idempotent_law() {
        assert_eq!(classify("x", "x"), MutationClass::Documentation);
    }

    #[test]
    fn resolve_prefers_valid_explicit_class() {
        assert_eq!(
            resolve(Some("BUG_FIX"), "a", "b"),
            MutationClass::BugFix
        );
    }

    #[test]
    fn resolve_falls_back_to_classify_on_invalid_explicit() {
        assert_eq!(
            resolve(Some("NOT_A_REAL_CLASS"), "same", "same"),
            MutationClass::Documentation
        );
    }

    #[test]
    fn resolve_falls_back_to_classify_when_absent() {
        assert_eq!(resolve(None, "same", "same"), MutationClass::Documentation);
    }

    #[test]
    fn mutation_class_serializes_to_screaming_snake_case() {
        let json = serde_json::to_string(&MutationClass::AstRefactor).unwrap();
        assert_eq!(json, "\"AST_REFACTOR\"");
        let json = serde_json::to_string(&MutationClass::BugFix).unwrap();
        assert_eq!(json, "\"BUG_FIX\"");
    }

    proptest::proptest! {
        #[test]
        fn prop_identical_always_documentation(s in ".{0,100}") {
            proptest::prop_assert_eq!(classify(&s, &s), MutationClass::Documentation);
        }
    }
}
