//! Occurrence registries assigning stable ids to repeated snapshot calls.
//!
//! Each registry keeps two counters per key:
//! - `running`: calls made by the test currently holding the key, reset by
//!   the test's cleanup hook so a re-run starts again from 1
//! - `cleanup`: every call observed by the process, never reset; read by the
//!   obsolescence scan
//!
//! Both counters move together under one lock. No I/O happens while it is
//! held.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Placeholder for the occurrence number in a generic standalone path.
pub const OCCURRENCE_PLACEHOLDER: &str = "%d";

/// Entry id for the `n`th call of `test_name`.
pub fn entry_id(test_name: &str, n: usize) -> String {
    format!("{} - {}", test_name, n)
}

/// Substitute `n` for the last placeholder in `generic`.
pub fn instantiate(generic: &str, n: usize) -> String {
    match generic.rfind(OCCURRENCE_PLACEHOLDER) {
        Some(idx) => format!(
            "{}{}{}",
            &generic[..idx],
            n,
            &generic[idx + OCCURRENCE_PLACEHOLDER.len()..]
        ),
        None => generic.to_string(),
    }
}

/// Every id a set of cumulative counters accounts for.
///
/// `count` is how many times the test binary repeated the run; dividing by
/// it recovers the number of calls made in a single run. Each key yields at
/// least its first occurrence.
pub fn occurrences<F>(
    counters: &HashMap<String, usize>,
    count: usize,
    format: F,
) -> HashSet<String>
where
    F: Fn(&str, usize) -> String,
{
    let count = count.max(1);
    let mut result = HashSet::with_capacity(counters.len());
    for (key, counter) in counters {
        let per_run = (counter / count).max(1);
        for n in 1..=per_run {
            result.insert(format(key, n));
        }
    }
    result
}

#[derive(Debug, Default)]
struct Counters {
    running: HashMap<PathBuf, HashMap<String, usize>>,
    cleanup: HashMap<PathBuf, HashMap<String, usize>>,
}

/// Registry for entries inside shared snapshot files, keyed by
/// `(snapshot file, test name)`.
#[derive(Debug, Default)]
pub struct Registry {
    counters: Mutex<Counters>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next entry id for `test_name` in `snap_path`.
    pub fn get_test_id(&self, snap_path: &Path, test_name: &str) -> String {
        let n = {
            let mut counters = self.lock();
            *counters
                .cleanup
                .entry(snap_path.to_path_buf())
                .or_default()
                .entry(test_name.to_string())
                .or_insert(0) += 1;
            let running = counters
                .running
                .entry(snap_path.to_path_buf())
                .or_default()
                .entry(test_name.to_string())
                .or_insert(0);
            *running += 1;
            *running
        };

        log::debug!("Assigned occurrence {} to {} in {}", n, test_name, snap_path.display());
        entry_id(test_name, n)
    }

    /// Restart numbering for `test_name` in `snap_path`.
    pub fn reset(&self, snap_path: &Path, test_name: &str) {
        if let Some(tests) = self.lock().running.get_mut(snap_path) {
            if let Some(counter) = tests.get_mut(test_name) {
                *counter = 0;
            }
        }
    }

    /// Current running counter.
    pub fn running(&self, snap_path: &Path, test_name: &str) -> usize {
        self.lock()
            .running
            .get(snap_path)
            .and_then(|tests| tests.get(test_name))
            .copied()
            .unwrap_or(0)
    }

    /// Copy of the cumulative counters, per snapshot file.
    pub fn cleanup_counts(&self) -> HashMap<PathBuf, HashMap<String, usize>> {
        self.lock().cleanup.clone()
    }

    /// Forget every counter.
    pub fn clear(&self) {
        *self.lock() = Counters::default();
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Default)]
struct StandaloneCounters {
    running: HashMap<String, usize>,
    cleanup: HashMap<String, usize>,
}

/// Registry for standalone snapshot files, keyed by the generic path.
#[derive(Debug, Default)]
pub struct StandaloneRegistry {
    counters: Mutex<StandaloneCounters>,
}

impl StandaloneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next occurrence for `generic` and return the instantiated
    /// absolute and relative paths.
    pub fn get_occurrence(&self, generic: &str, generic_rel: &str) -> (String, String) {
        let n = {
            let mut counters = self.lock();
            *counters.cleanup.entry(generic.to_string()).or_insert(0) += 1;
            let running = counters.running.entry(generic.to_string()).or_insert(0);
            *running += 1;
            *running
        };

        log::debug!("Assigned occurrence {} to {}", n, generic);
        (instantiate(generic, n), instantiate(generic_rel, n))
    }

    pub fn reset(&self, generic: &str) {
        if let Some(counter) = self.lock().running.get_mut(generic) {
            *counter = 0;
        }
    }

    pub fn running(&self, generic: &str) -> usize {
        self.lock().running.get(generic).copied().unwrap_or(0)
    }

    pub fn cleanup_counts(&self) -> HashMap<String, usize> {
        self.lock().cleanup.clone()
    }

    pub fn clear(&self) {
        *self.lock() = StandaloneCounters::default();
    }

    fn lock(&self) -> MutexGuard<'_, StandaloneCounters> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

type Sites = HashMap<PathBuf, HashSet<PathBuf>>;

/// Source files that made snapshot calls, per snapshot directory.
///
/// Several test binaries may share one snapshot directory; a file this run
/// never called from belongs to another binary.
#[derive(Debug, Default)]
pub struct CallSites {
    sites: Mutex<Sites>,
}

impl CallSites {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, snapshot_dir: &Path, source: &Path) {
        self.lock()
            .entry(snapshot_dir.to_path_buf())
            .or_default()
            .insert(source.to_path_buf());
    }

    /// Sources whose calls went to `snapshot_dir`.
    pub fn sources(&self, snapshot_dir: &Path) -> HashSet<PathBuf> {
        self.lock().get(snapshot_dir).cloned().unwrap_or_default()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Sites> {
        self.sites.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn concurrent_ids_have_no_gaps() {
        let registry = Arc::new(Registry::new());
        let path = PathBuf::from("/tmp/__snapshots__/mock.snap");

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let path = path.clone();
                thread::spawn(move || registry.get_test_id(&path, "mock-name"))
            })
            .collect();
        let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let expected: HashSet<String> = (1..=100).map(|n| entry_id("mock-name", n)).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn reset_only_touches_running() {
        let registry = Registry::new();
        let path = Path::new("mock.snap");

        assert_eq!(registry.get_test_id(path, "mock-name"), "mock-name - 1");
        assert_eq!(registry.get_test_id(path, "mock-name"), "mock-name - 2");
        registry.reset(path, "mock-name");
        assert_eq!(registry.running(path, "mock-name"), 0);
        assert_eq!(registry.get_test_id(path, "mock-name"), "mock-name - 1");

        assert_eq!(registry.cleanup_counts()[path]["mock-name"], 3);
    }

    #[test]
    fn same_name_in_different_files_counts_separately() {
        let registry = Registry::new();
        assert_eq!(registry.get_test_id(Path::new("a.snap"), "t"), "t - 1");
        assert_eq!(registry.get_test_id(Path::new("b.snap"), "t"), "t - 1");
    }

    #[test]
    fn standalone_instantiates_both_paths() {
        let registry = StandaloneRegistry::new();
        let got =
            registry.get_occurrence("/abs/__snapshots__/t_%d.snap", "__snapshots__/t_%d.snap");
        assert_eq!(
            got,
            (
                "/abs/__snapshots__/t_1.snap".to_string(),
                "__snapshots__/t_1.snap".to_string()
            )
        );

        let handles: Vec<_> = {
            let registry = Arc::new(StandaloneRegistry::new());
            (0..50)
                .map(|_| {
                    let registry = Arc::clone(&registry);
                    thread::spawn(move || registry.get_occurrence("x_%d.snap", "x_%d.snap").0)
                })
                .collect()
        };
        let paths: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(paths.len(), 50);
        assert!(paths.contains("x_50.snap"));
    }

    #[test]
    fn instantiate_uses_last_placeholder() {
        assert_eq!(instantiate("dir%d/name_%d.snap", 4), "dir%d/name_4.snap");
        assert_eq!(instantiate("plain.snap", 4), "plain.snap");
    }

    #[test]
    fn occurrences_divide_by_repeat_count() {
        let counters = HashMap::from([("a".to_string(), 6), ("b".to_string(), 1)]);
        let got = occurrences(&counters, 3, entry_id);
        let expected: HashSet<String> =
            ["a - 1", "a - 2", "b - 1"].iter().map(|s| s.to_string()).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn call_sites_per_directory() {
        let sites = CallSites::new();
        let dir = Path::new("/repo/tests/__snapshots__");
        sites.record(dir, Path::new("/repo/tests/a.rs"));
        sites.record(dir, Path::new("/repo/tests/a.rs"));
        sites.record(Path::new("/repo/other"), Path::new("/repo/tests/b.rs"));

        assert_eq!(sites.sources(dir), HashSet::from([PathBuf::from("/repo/tests/a.rs")]));
        assert!(sites.sources(Path::new("/repo")).is_empty());

        sites.clear();
        assert!(sites.sources(dir).is_empty());
    }
}
