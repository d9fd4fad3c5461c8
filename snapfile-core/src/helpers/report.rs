//! Human-readable diff report between a stored and a received snapshot.

use std::fmt::Write;

use crate::helpers::diff::{format_range_unified, SequenceMatcher, Tag, DEFAULT_CONTEXT};

/// Split on `\n`, keeping a newline at the end of every piece.
///
/// A trailing newline in `s` yields a final `"\n"` element.
pub fn split_newlines(s: &str) -> Vec<String> {
    s.split('\n').map(|line| format!("{}\n", line)).collect()
}

/// Line diff of `expected` against `received`.
///
/// Returns `(inserted, deleted, body)`; `body` is empty when both sides are
/// equal. A trailing newline counts as a final empty line.
pub fn pretty_diff(expected: &str, received: &str) -> (usize, usize, String) {
    let a = split_newlines(expected);
    let b = split_newlines(received);

    let matcher = SequenceMatcher::new(&a, &b);
    let groups = matcher.grouped_opcodes(DEFAULT_CONTEXT);
    let with_ranges = groups.len() > 1;

    let (mut inserted, mut deleted) = (0, 0);
    let mut body = String::new();

    for group in &groups {
        if with_ranges {
            if let (Some(first), Some(last)) = (group.first(), group.last()) {
                let _ = writeln!(
                    body,
                    "@@ -{} +{} @@",
                    format_range_unified(first.i1, last.i2),
                    format_range_unified(first.j1, last.j2)
                );
            }
        }

        for code in group {
            match code.tag {
                Tag::Equal => {
                    for line in &a[code.i1..code.i2] {
                        body.push_str("  ");
                        body.push_str(line);
                    }
                }
                Tag::Insert | Tag::Delete | Tag::Replace => {
                    for line in &a[code.i1..code.i2] {
                        body.push_str("- ");
                        body.push_str(line);
                        deleted += 1;
                    }
                    for line in &b[code.j1..code.j2] {
                        body.push_str("+ ");
                        body.push_str(line);
                        inserted += 1;
                    }
                }
            }
        }
    }

    (inserted, deleted, body)
}

/// Wrap a diff body with its header and, if known, the snapshot location.
///
/// Returns an empty string when `diff` is empty.
pub fn build_diff_report(
    inserted: usize,
    deleted: usize,
    diff: &str,
    location: Option<(&str, usize)>,
) -> String {
    if diff.is_empty() {
        return String::new();
    }

    let mut report = format!(
        "\n- Snapshot - {}\n+ Received + {}\n\n{}",
        deleted, inserted, diff
    );
    if let Some((path, line)) = location {
        let _ = write!(report, "\nat {}:{}\n", path, line);
    }
    report
}

/// Full report for a mismatch, or `None` when the two sides are equal.
pub fn diff_report(
    expected: &str,
    received: &str,
    location: Option<(&str, usize)>,
) -> Option<String> {
    let (inserted, deleted, body) = pretty_diff(expected, received);
    if body.is_empty() {
        return None;
    }
    Some(build_diff_report(inserted, deleted, &body, location))
}
