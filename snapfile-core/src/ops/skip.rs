//! Skipped test tracking.
//!
//! Snapshots of tests that were skipped, or filtered out of the run, were
//! not exercised and must not be reported as obsolete.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::SNAPS_EXT;

static TEST_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)").expect("valid fn pattern"));

/// Names of tests that skipped themselves.
#[derive(Debug, Default)]
pub struct SkipTracker {
    skipped: Mutex<Vec<String>>,
}

impl SkipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, test_name: impl Into<String>) {
        self.lock().push(test_name.into());
    }

    pub fn values(&self) -> Vec<String> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Whether the entry `test_id` (`name - N`) was not exercised.
    ///
    /// True if its name, or a parent of it, skipped itself, or if `run`
    /// filtered it out.
    pub fn is_skipped(&self, test_id: &str, run: Option<&Regex>) -> bool {
        let name = test_id.split(" - ").next().unwrap_or(test_id);

        let skipped = self
            .lock()
            .iter()
            .any(|s| {
                name == s.as_str()
                    || name.strip_prefix(s.as_str()).is_some_and(|rest| rest.starts_with('/'))
            });
        if skipped {
            return true;
        }

        run.is_some_and(|re| !re.is_match(test_id))
    }

    /// Whether an unreferenced snapshot file belongs to a test source that
    /// `run` filtered out entirely.
    ///
    /// Looks for `<stem>.rs` in the parent of `dir` and checks its function names against
    /// the filter. Without a filter, or when the source cannot be read,
    /// the file is not considered skipped.
    pub fn is_file_skipped(&self, dir: &Path, filename: &str, run: Option<&Regex>) -> bool {
        let Some(run) = run else {
            return false;
        };

        let stem = filename.split(SNAPS_EXT).next().unwrap_or(filename);
        let source = dir.parent().unwrap_or(dir).join(format!("{}.rs", stem));
        match declared_fns(&source) {
            Some(names) => !names.iter().any(|name| run.is_match(name)),
            None => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.skipped.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Names of the functions declared in a Rust source file, or `None` when it
/// cannot be read.
pub(crate) fn declared_fns(source: &Path) -> Option<Vec<String>> {
    let content = match fs_err::read_to_string(source) {
        Ok(content) => content,
        Err(e) => {
            log::debug!("Cannot inspect source: {}", e);
            return None;
        }
    };
    let names = TEST_FN
        .captures_iter(&content)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .collect();
    Some(names)
}
