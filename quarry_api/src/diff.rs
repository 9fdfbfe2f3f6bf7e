//! Line-level views over unified diff text.

use serde::{Deserialize, Serialize};

/// A single added or deleted line together with its line number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    /// 1-based line number: post-image for additions, pre-image for deletions.
    pub number: u32,
    /// Line content without the leading marker.
    pub text: String,
}

impl DiffLine {
    /// Convenience constructor.
    #[must_use]
    pub fn new(number: u32, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Added and deleted lines extracted from a diff.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedDiff {
    /// Lines present only in the post-image.
    #[serde(default)]
    pub added: Vec<DiffLine>,
    /// Lines present only in the pre-image.
    #[serde(default)]
    pub deleted: Vec<DiffLine>,
}

impl ParsedDiff {
    /// Line numbers of every added line, in diff order.
    pub fn added_line_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.added.iter().map(|line| line.number)
    }

    /// Line numbers of every deleted line, in diff order.
    pub fn deleted_line_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.deleted.iter().map(|line| line.number)
    }
}

/// Map every added and deleted line of `diff` to its line number.
///
/// Hunk headers (`@@ -a,b +c,d @@`) reset the counters; lines seen before
/// the first hunk are numbered from 1. File headers (`---`/`+++`) ahead of
/// the first hunk and `\ No newline at end of file` markers never count as
/// changes.
#[must_use]
pub fn parse_diff(diff: &str) -> ParsedDiff {
    let mut parsed = ParsedDiff::default();
    let mut old_line: u32 = 1;
    let mut new_line: u32 = 1;
    let mut in_hunk = false;

    for line in diff.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with("@@") {
            if let Some((old_start, new_start)) = hunk_starts(line) {
                old_line = old_start;
                new_line = new_start;
                in_hunk = true;
            }
        } else if (!in_hunk && is_file_header(line)) || line.starts_with('\\') {
            continue;
        } else if let Some(text) = line.strip_prefix('-') {
            parsed.deleted.push(DiffLine::new(old_line, text));
            old_line = old_line.saturating_add(1);
        } else if let Some(text) = line.strip_prefix('+') {
            parsed.added.push(DiffLine::new(new_line, text));
            new_line = new_line.saturating_add(1);
        } else {
            old_line = old_line.saturating_add(1);
            new_line = new_line.saturating_add(1);
        }
    }

    parsed
}

/// Number of lines that start with a single `+`.
pub(crate) fn count_added(diff: &str) -> usize {
    count_marked(diff, '+', "+++")
}

/// Number of lines that start with a single `-`.
pub(crate) fn count_removed(diff: &str) -> usize {
    count_marked(diff, '-', "---")
}

fn count_marked(diff: &str, marker: char, header: &str) -> usize {
    diff.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.starts_with(marker) && !line.starts_with(header))
        .count()
}

fn is_file_header(line: &str) -> bool {
    line.starts_with("+++ ") || line.starts_with("--- ") || line == "+++" || line == "---"
}

fn hunk_starts(header: &str) -> Option<(u32, u32)> {
    let mut tokens = header.split_whitespace().skip(1);
    let old = tokens.next()?.strip_prefix('-')?;
    let new = tokens.next()?.strip_prefix('+')?;
    Some((range_start(old)?, range_start(new)?))
}

fn range_start(range: &str) -> Option<u32> {
    let start: u32 = range.split(',').next()?.parse().ok()?;
    // A zero start denotes an empty side (e.g. a new file's pre-image).
    Some(start.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "@@ -1,4 +1,5 @@\n import os\n-x = 1\n+x = 2\n+y = 3\n try:\n     pass\n@@ -20,2 +21,2 @@ def main():\n-    old()\n+    new()\n     done()\n";

    #[test]
    fn parse_diff_numbers_lines_per_side() {
        let parsed = parse_diff(SAMPLE);

        assert_eq!(
            parsed.added,
            vec![
                DiffLine::new(2, "x = 2"),
                DiffLine::new(3, "y = 3"),
                DiffLine::new(21, "    new()"),
            ]
        );
        assert_eq!(
            parsed.deleted,
            vec![DiffLine::new(2, "x = 1"), DiffLine::new(20, "    old()")]
        );
    }

    #[test]
    fn parse_diff_skips_headers_and_no_newline_marker() {
        let diff = "--- a/x.py\n+++ b/x.py\n@@ -0,0 +1,1 @@\n+print(1)\n\\ No newline at end of file\n";
        let parsed = parse_diff(diff);

        assert_eq!(parsed.added, vec![DiffLine::new(1, "print(1)")]);
        assert!(parsed.deleted.is_empty());
    }

    #[test]
    fn parse_diff_without_hunk_header_starts_at_one() {
        let parsed = parse_diff("+++ b/x.py\n+print(1)\n");
        assert_eq!(parsed.added_line_numbers().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn counts_ignore_file_headers_and_carriage_returns() {
        let diff = "--- a/x.py\r\n+++ b/x.py\r\n@@ -1 +1 @@\r\n-a\r\n+b\r\n+c\r\n";
        assert_eq!(count_added(diff), 2);
        assert_eq!(count_removed(diff), 1);
    }

    #[test]
    fn removed_sql_comment_inside_hunk_is_a_deletion() {
        let parsed = parse_diff("@@ -3,1 +3,0 @@\n--- legacy comment\n");
        assert_eq!(parsed.deleted, vec![DiffLine::new(3, "-- legacy comment")]);
    }

    #[test]
    fn counts_are_zero_for_empty_diff() {
        assert_eq!(count_added(""), 0);
        assert_eq!(count_removed(""), 0);
        assert_eq!(parse_diff(""), ParsedDiff::default());
    }

    #[test]
    fn malformed_hunk_header_keeps_previous_counters() {
        let parsed = parse_diff("@@ garbage @@\n+a\n");
        assert_eq!(parsed.added, vec![DiffLine::new(1, "a")]);
    }

    #[test]
    fn counters_saturate_at_the_largest_line_number() {
        let parsed = parse_diff("@@ -4294967295,2 +1,0 @@\n-a\n-b\n");
        assert_eq!(
            parsed.deleted,
            vec![DiffLine::new(u32::MAX, "a"), DiffLine::new(u32::MAX, "b")]
        );
    }
}
