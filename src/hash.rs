//! Normalised, line-ending-stable SHA-256 hashing over content or line ranges.
//!
//! The hasher is a pure function module: no I/O, no shared state, nothing
//! that can fail. Every other component treats its output — 64 lowercase hex
//! characters — as an opaque, stable fingerprint of file content.

use sha2::{Digest, Sha256};

/// Replace `\r\n` and stray `\r` with `\n` so hashing is stable across
/// platforms and across files checked out with different line-ending
/// settings.
fn normalise_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Hash `content`, returning 64 lowercase hex characters.
///
/// Line endings are normalised before hashing (see [`normalise_line_endings`]),
/// so `digest("a\r\nb")`, `digest("a\nb")`, and `digest("a\rb")` are equal.
#[must_use]
pub fn digest(content: &str) -> String {
    let normalised = normalise_line_endings(content);
    let mut hasher = Sha256::new();
    hasher.update(normalised.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split `content` into lines the way a line count should read: normalise
/// line endings, then drop exactly one trailing `\n` if present before
/// splitting, so a file ending in a newline (the common case) does not
/// report a spurious trailing empty line.
fn lines_for_counting(content: &str) -> Vec<String> {
    let normalised = normalise_line_endings(content);
    let trimmed = normalised.strip_suffix('\n').unwrap_or(&normalised);
    trimmed.split('\n').map(ToOwned::to_owned).collect()
}

/// Hash the 1-based inclusive line range `[start_line, end_line]` of
/// `content`.
///
/// Lines are extracted per [`lines_for_counting`] and rejoined with `\n`
/// (no trailing newline) before hashing. If `start_line > end_line` after
/// clamping, or the range lies entirely outside `[1, line_count]`, the
/// empty string is hashed — a fixed, well-known value every caller can rely
/// on rather than treating as an error.
#[must_use]
pub fn digest_range(content: &str, start_line: usize, end_line: usize) -> String {
    let lines = lines_for_counting(content);
    let line_count = lines.len();

    // start_line/end_line are 1-based; clamp into [1, line_count].
    let start = start_line.max(1);
    let end = end_line.min(line_count);

    if start > end {
        return digest("");
    }

    let extracted = lines[start - 1..end].join("\n");
    digest(&extracted)
}

/// Count the number of lines in `content`, treating empty content as one
/// (empty) line and a single trailing newline as not introducing an extra
/// line. Matches the Post-Write Recorder's `max(1, split("\n").len())` rule
/// (§4.11 step 4) under the convention that a file's final newline
/// terminates its last line rather than starting a new one.
#[must_use]
pub fn line_count(content: &str) -> usize {
    lines_for_counting(content).len().max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!(digest("hello world"), digest("hello world"));
    }

    #[test]
    fn digest_is_64_lowercase_hex() {
        let d = digest("anything");
        assert_eq!(d.len(), 64);
        assert!(d.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_normalises_line_endings() {
        let a = digest("a\r\nb");
        let b = digest("a\nb");
        let c = digest("a\rb");
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn digest_range_full_range_equals_digest() {
        let content = "line1\nline2\nline3";
        assert_eq!(digest_range(content, 1, 3), digest(content));
    }

    #[test]
    fn digest_range_single_line() {
        let content = "a\nb\nc";
        assert_eq!(digest_range(content, 2, 2), digest("b"));
    }

    #[test]
    fn digest_range_start_after_end_hashes_empty() {
        let content = "a\nb\nc";
        assert_eq!(digest_range(content, 3, 1), digest(""));
    }

    #[test]
    fn digest_range_wholly_out_of_range_hashes_empty() {
        let content = "a\nb";
        assert_eq!(digest_range(content, 10, 20), digest(""));
    }

    #[test]
    fn digest_range_clamps_partial_overlap() {
        // end_line beyond the file is clamped to line_count, not rejected.
        let content = "a\nb\nc";
        assert_eq!(digest_range(content, 2, 100), digest("b\nc"));
    }

    #[test]
    fn line_count_counts_lines() {
        assert_eq!(line_count("a\nb\nc"), 3);
        assert_eq!(line_count(""), 1);
        assert_eq!(line_count("single line, no newline"), 1);
    }

    #[test]
    fn line_count_ignores_one_trailing_newline() {
        assert_eq!(line_count("x = 2\n"), 1);
        assert_eq!(line_count("a\nb\n"), 2);
    }

    #[test]
    fn digest_range_of_single_trailing_newline_line_drops_the_newline() {
        assert_eq!(digest_range("x = 2\n", 1, 1), digest("x = 2"));
    }

    proptest::proptest! {
        #[test]
        fn prop_digest_range_full_matches_digest(s in "[a-zA-Z0-9\n]{0,200}") {
            let n = line_count(&s);
            proptest::prop_assert_eq!(digest_range(&s, 1, n), digest(&s));
        }

        #[test]
        fn prop_digest_is_pure(s in ".{0,200}") {
            proptest::prop_assert_eq!(digest(&s), digest(&s));
        }
    }
}
