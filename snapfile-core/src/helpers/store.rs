//! On-disk snapshot files.
//!
//! Standalone files hold one snapshot as raw content. Shared files hold any
//! number of framed entries:
//!
//! ```text
//!
//! [<id>]
//! <body line>
//! <body line>
//! ---
//! ```
//!
//! A body line that is exactly `---` is stored as `/-/-/-/`.
//!
//! The store has no update policy; the caller decides when to write.

use std::collections::HashSet;
use std::io::{ErrorKind, Write};
use std::path::Path;

use fs_err as fs;

use crate::helpers::natural::{is_naturally_sorted, natural_cmp};
use crate::types::{Result, SnapError};

/// Line closing an entry.
pub const END_SEQUENCE: &str = "---";

/// What a body line equal to [`END_SEQUENCE`] is stored as.
pub const ESCAPED_END_SEQUENCE: &str = "/-/-/-/";

/// Header prefix recognized by default during reconciliation.
pub const DEFAULT_ID_PREFIX: &str = "Test";

/// Replace every line that is exactly the end sequence with its escape.
pub fn escape_end_chars(s: &str) -> String {
    map_lines(s, END_SEQUENCE, ESCAPED_END_SEQUENCE)
}

/// Inverse of [`escape_end_chars`].
pub fn unescape_end_chars(s: &str) -> String {
    map_lines(s, ESCAPED_END_SEQUENCE, END_SEQUENCE)
}

fn map_lines(s: &str, from: &str, to: &str) -> String {
    s.split('\n')
        .map(|line| if line == from { to } else { line })
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SnapError::NotFound,
        _ => SnapError::Io(e),
    })
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Content of a standalone snapshot file.
pub fn read_standalone(path: &Path) -> Result<String> {
    read_to_string(path)
}

/// Create or overwrite a standalone snapshot file.
pub fn upsert_standalone(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, content)?;
    log::debug!("Wrote standalone snapshot {}", path.display());
    Ok(())
}

/// One framed entry of a shared file, as byte offsets into its content.
struct EntrySpan<'c> {
    id: &'c str,
    /// 1-based line number of the header.
    header_line: usize,
    body_start: usize,
    /// Start of the end sequence line.
    body_end: usize,
}

/// Every terminated entry of `content`, in file order.
///
/// Headers are only recognized between entries. Inside a body nothing but
/// the end sequence is significant, so a body line that looks like a header
/// stays part of the body.
fn entries(content: &str) -> Vec<EntrySpan<'_>> {
    let mut spans = Vec::new();
    let mut open: Option<(&str, usize, usize)> = None;
    let mut offset = 0;

    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let text = line.strip_suffix('\n').unwrap_or(line);
        match open {
            None => {
                if let Some(id) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                    open = Some((id, idx + 1, offset + line.len()));
                }
            }
            Some((id, header_line, body_start)) if text == END_SEQUENCE => {
                spans.push(EntrySpan {
                    id,
                    header_line,
                    body_start,
                    body_end: offset,
                });
                open = None;
            }
            Some(_) => {}
        }
        offset += line.len();
    }
    spans
}

fn locate<'c>(content: &'c str, id: &str) -> Option<EntrySpan<'c>> {
    entries(content).into_iter().find(|entry| entry.id == id)
}

/// Body of entry `id` and the 1-based line of its header.
///
/// A missing file, a missing entry and an entry without its end sequence
/// are all [`SnapError::NotFound`].
pub fn read_entry(path: &Path, id: &str) -> Result<(String, usize)> {
    let content = read_to_string(path)?;
    let span = locate(&content, id).ok_or(SnapError::NotFound)?;
    let body = &content[span.body_start..span.body_end];
    let body = body.strip_suffix('\n').unwrap_or(body);
    Ok((unescape_end_chars(body), span.header_line))
}

fn frame(id: &str, body: &str) -> String {
    format!("\n[{}]\n{}\n{}\n", id, escape_end_chars(body), END_SEQUENCE)
}

/// Append a new entry, creating the file and its directory if needed.
pub fn add_entry(path: &Path, id: &str, body: &str) -> Result<()> {
    ensure_parent(path)?;
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(frame(id, body).as_bytes())?;
    log::debug!("Added entry {} to {}", id, path.display());
    Ok(())
}

/// Replace the body of entry `id`, leaving every other byte as it was.
pub fn update_entry(path: &Path, id: &str, body: &str) -> Result<()> {
    let content = read_to_string(path)?;
    let span = locate(&content, id).ok_or(SnapError::NotFound)?;

    let mut updated = String::with_capacity(content.len() + body.len());
    updated.push_str(&content[..span.body_start]);
    updated.push_str(&escape_end_chars(body));
    updated.push('\n');
    updated.push_str(&content[span.body_end..]);

    fs::write(path, updated)?;
    log::debug!("Updated entry {} in {}", id, path.display());
    Ok(())
}

/// Id inside a header line `[<prefix>... - <N>]`, if `line` is one.
pub fn parse_header<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let id = line.strip_prefix('[')?.strip_suffix(']')?;
    is_entry_id(id, prefix).then_some(id)
}

/// Whether `id` has the `<prefix>... - <N>` shape of a snapshot entry id.
pub fn is_entry_id(id: &str, prefix: &str) -> bool {
    if !id.starts_with(prefix) {
        return false;
    }
    match id.rsplit_once(" - ") {
        Some((_, n)) => !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// What reconciling a shared file should do.
#[derive(Debug, Clone, Copy)]
pub struct Reconcile<'a> {
    /// Header prefix entries must carry to be recognized.
    pub prefix: &'a str,
    /// Physically drop obsolete entries.
    pub remove: bool,
    /// Rewrite entries in natural order of their ids.
    pub sort: bool,
}

/// Scan a shared file and return the ids of its obsolete entries.
///
/// An entry is obsolete when its id carries the configured prefix, is not in
/// `live` and `is_skipped` does not exempt it. Entries the prefix does not
/// recognize are never obsolete and are carried through a rewrite as they
/// are. The file is rewritten only when obsolete entries are removed or the
/// order changes; otherwise its bytes stay untouched.
pub fn reconcile<F>(
    path: &Path,
    live: &HashSet<String>,
    is_skipped: F,
    opts: Reconcile<'_>,
) -> Result<Vec<String>>
where
    F: Fn(&str) -> bool,
{
    let content = fs::read_to_string(path)?;

    let mut kept: Vec<(&str, &str)> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut obsolete = Vec::new();

    for entry in entries(&content) {
        let is_obsolete =
            is_entry_id(entry.id, opts.prefix) && !live.contains(entry.id) && !is_skipped(entry.id);
        if is_obsolete {
            obsolete.push(entry.id.to_string());
            if opts.remove {
                continue;
            }
        }
        if seen.insert(entry.id) {
            kept.push((entry.id, &content[entry.body_start..entry.body_end]));
        }
    }

    let should_remove = opts.remove && !obsolete.is_empty();
    let ids: Vec<&str> = kept.iter().map(|(id, _)| *id).collect();
    let should_sort = opts.sort && !is_naturally_sorted(&ids);
    if !should_remove && !should_sort {
        log::debug!(
            "{} is up to date, {} obsolete entries",
            path.display(),
            obsolete.len()
        );
        return Ok(obsolete);
    }

    if should_sort {
        kept.sort_by(|a, b| natural_cmp(a.0, b.0));
    }

    let mut rewritten = String::with_capacity(content.len());
    for (id, body) in &kept {
        rewritten.push_str(&format!("\n[{}]\n{}{}\n", id, body, END_SEQUENCE));
    }
    fs::write(path, rewritten)?;
    log::info!(
        "Rewrote {} (removed {}, sorted {})",
        path.display(),
        if should_remove { obsolete.len() } else { 0 },
        should_sort
    );

    Ok(obsolete)
}
