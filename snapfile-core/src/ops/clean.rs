//! Obsolete snapshot scan and the end-of-run summary.

use std::collections::{HashMap, HashSet};
use std::fmt::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::helpers::registry::{entry_id, instantiate, occurrences, OCCURRENCE_PLACEHOLDER};
use crate::helpers::store::{self, Reconcile};
use crate::helpers::symbols::{
    ARROW_SYMBOL, BULLET_SYMBOL, ENTER_SYMBOL, ERROR_SYMBOL, SKIP_SYMBOL, SUCCESS_SYMBOL,
    UPDATE_SYMBOL,
};
use crate::ops::context::Snaps;
use crate::ops::skip::declared_fns;
use crate::types::{CleanOptions, Result, TestEvent, SNAPS_EXT};

/// Outcome of a test binary's snapshot calls and of the obsolete scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub obsolete_files: Vec<PathBuf>,
    pub obsolete_tests: Vec<String>,
    pub passed: usize,
    pub failed: usize,
    pub added: usize,
    pub updated: usize,
    pub skipped: usize,
    /// Obsolete files and entries were removed.
    pub cleaned: bool,
}

impl CleanReport {
    pub fn obsolete_count(&self) -> usize {
        self.obsolete_files.len() + self.obsolete_tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obsolete_count() == 0
            && self.passed == 0
            && self.failed == 0
            && self.added == 0
            && self.updated == 0
            && self.skipped == 0
    }
}

/// Run the obsolete scan over every snapshot directory the run touched.
///
/// In clean mode (see [`crate::Environment::should_clean`]) obsolete files
/// are deleted and obsolete entries removed from shared files.
pub fn clean(snaps: &Snaps, opts: &CleanOptions) -> Result<CleanReport> {
    let run = opts.run_regex()?;
    let count = opts.effective_count();
    let cleaning = snaps.environment().should_clean();
    let sort = opts.sort && !snaps.environment().is_ci;

    let shared = snaps.registry().cleanup_counts();
    let standalone_counts = snaps.standalone_registry().cleanup_counts();
    let standalone: HashSet<PathBuf> = occurrences(&standalone_counts, count, instantiate)
        .into_iter()
        .map(PathBuf::from)
        .collect();
    let taken = standalone_names(standalone_counts.keys());

    let scan = FileScan {
        shared: &shared,
        standalone: &standalone,
        taken: &taken,
        run: run.as_ref(),
        cleaning,
    };
    let (obsolete_files, used) = examine_files(snaps, &scan);
    let obsolete_tests = examine_snaps(snaps, &shared, &used, run.as_ref(), count, cleaning, sort)?;

    let events = snaps.events();
    let report = CleanReport {
        obsolete_files,
        obsolete_tests,
        passed: events.get(TestEvent::Passed),
        failed: events.get(TestEvent::Erred),
        added: events.get(TestEvent::Added),
        updated: events.get(TestEvent::Updated),
        skipped: snaps.skips().len(),
        cleaned: cleaning,
    };
    log::debug!("Snapshot scan finished: {:?}", report);
    Ok(report)
}

/// What this run referenced, for the file scan.
struct FileScan<'a> {
    shared: &'a HashMap<PathBuf, HashMap<String, usize>>,
    standalone: &'a HashSet<PathBuf>,
    /// `<name>` of every `<name>_%d.snap` taken this run.
    taken: &'a HashSet<String>,
    run: Option<&'a Regex>,
    cleaning: bool,
}

/// Base names of generic standalone paths, `TestA` for `.../TestA_%d.snap`.
fn standalone_names<'a>(generic: impl Iterator<Item = &'a String>) -> HashSet<String> {
    let suffix = format!("_{}", OCCURRENCE_PLACEHOLDER);
    generic
        .filter_map(|path| Path::new(path).file_name())
        .map(|name| name.to_string_lossy())
        .filter_map(|name| name.rsplit_once(suffix.as_str()).map(|(base, _)| base.to_string()))
        .collect()
}

/// `<name>` of a standalone file base `<name>_<N>`.
fn standalone_base(base: &str) -> Option<&str> {
    let (name, n) = base.rsplit_once('_')?;
    (!n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())).then_some(name)
}

/// Rust sources next to the ones that called into a snapshot directory,
/// which this run never called from. With one test binary per source under
/// `tests/`, these belong to other binaries.
fn foreign_sources(called: &HashSet<PathBuf>) -> Vec<PathBuf> {
    let mut source_dirs: Vec<&Path> = called.iter().filter_map(|source| source.parent()).collect();
    source_dirs.sort();
    source_dirs.dedup();

    source_dirs
        .into_iter()
        .flat_map(|dir| {
            WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .filter(|path| !called.contains(path))
        .collect()
}

/// Whether an unreferenced snapshot file was written from a foreign source:
/// a shared file named after it, or a standalone file of a test it declares
/// whose name this run never took.
fn belongs_elsewhere(name: &str, foreign: &[PathBuf], taken: &HashSet<String>) -> bool {
    let base = name.split(SNAPS_EXT).next().unwrap_or(name);
    if foreign
        .iter()
        .any(|source| source.file_stem().is_some_and(|stem| stem == base))
    {
        return true;
    }

    let Some(test) = standalone_base(base) else {
        return false;
    };
    if taken.contains(test) {
        return false;
    }
    foreign
        .iter()
        .filter_map(|source| declared_fns(source))
        .flatten()
        .any(|f| test == f || test.strip_suffix(f.as_str()).is_some_and(|rest| rest.ends_with('_')))
}

/// Snapshot files in the touched directories nothing referenced, and the
/// shared files that were referenced.
fn examine_files(snaps: &Snaps, scan: &FileScan<'_>) -> (Vec<PathBuf>, Vec<PathBuf>) {
    let mut dirs: Vec<&Path> = scan
        .shared
        .keys()
        .chain(scan.standalone.iter())
        .filter_map(|path| path.parent())
        .collect();
    dirs.sort();
    dirs.dedup();

    let mut obsolete = Vec::new();
    let mut used = Vec::new();

    for dir in dirs {
        let foreign = foreign_sources(&snaps.call_sites().sources(dir));
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok());

        for entry in entries {
            let name = entry.file_name().to_string_lossy();
            if entry.file_type().is_dir() || !name.contains(SNAPS_EXT) {
                continue;
            }

            let path = entry.path();
            if scan.shared.contains_key(path) {
                used.push(path.to_path_buf());
                continue;
            }
            if scan.standalone.contains(path) {
                continue;
            }
            if belongs_elsewhere(&name, &foreign, scan.taken) {
                log::debug!("{} belongs to another test binary", path.display());
                continue;
            }
            if snaps.skips().is_file_skipped(dir, &name, scan.run) {
                continue;
            }

            obsolete.push(path.to_path_buf());
            if !scan.cleaning {
                continue;
            }
            match fs::remove_file(path) {
                Ok(()) => log::info!("Removed obsolete snapshot file {}", path.display()),
                Err(e) => log::warn!("{}", e),
            }
        }
    }

    (obsolete, used)
}

/// Obsolete entries in the referenced shared files.
fn examine_snaps(
    snaps: &Snaps,
    shared: &HashMap<PathBuf, HashMap<String, usize>>,
    used: &[PathBuf],
    run: Option<&Regex>,
    count: usize,
    cleaning: bool,
    sort: bool,
) -> Result<Vec<String>> {
    let mut obsolete = Vec::new();

    for path in used {
        let live = shared
            .get(path)
            .map(|tests| occurrences(tests, count, entry_id))
            .unwrap_or_default();

        let found = store::reconcile(
            path,
            &live,
            |id| snaps.skips().is_skipped(id, run),
            Reconcile {
                prefix: snaps.id_prefix(),
                remove: cleaning,
                sort,
            },
        )?;
        obsolete.extend(found);
    }

    Ok(obsolete)
}

fn event_line(out: &mut String, symbol: &str, count: usize, verb: &str) {
    if count == 0 {
        return;
    }
    let subject = if count > 1 { "snapshots" } else { "snapshot" };
    let _ = writeln!(out, "{}{} {} {}", symbol, count, subject, verb);
}

fn object_list<T: std::fmt::Display>(out: &mut String, objects: &[T], name: &str, cleaned: bool) {
    if objects.is_empty() {
        return;
    }
    let plural = if objects.len() > 1 { "s" } else { "" };
    let action = if cleaned { "removed" } else { "obsolete" };
    let _ = writeln!(
        out,
        "\n{}{} snapshot {}{} {}",
        ARROW_SYMBOL,
        objects.len(),
        name,
        plural,
        action
    );
    for object in objects {
        let _ = writeln!(out, "  {}{}{}", ENTER_SYMBOL, BULLET_SYMBOL, object);
    }
}

/// Human-readable summary, empty when there is nothing to report.
pub fn summary(report: &CleanReport) -> String {
    if report.is_empty() {
        return String::new();
    }

    let mut out = String::from("\nSnapshot Summary\n\n");
    event_line(&mut out, SUCCESS_SYMBOL, report.passed, "passed");
    event_line(&mut out, ERROR_SYMBOL, report.failed, "failed");
    event_line(&mut out, UPDATE_SYMBOL, report.added, "added");
    event_line(&mut out, UPDATE_SYMBOL, report.updated, "updated");
    event_line(&mut out, SKIP_SYMBOL, report.skipped, "skipped");

    let files: Vec<_> = report.obsolete_files.iter().map(|p| p.display()).collect();
    object_list(&mut out, &files, "file", report.cleaned);
    object_list(&mut out, &report.obsolete_tests, "test", report.cleaned);

    if !report.cleaned && report.obsolete_count() > 0 {
        let it = if report.obsolete_count() > 1 { "them" } else { "it" };
        let _ = writeln!(
            out,
            "\nTo remove {}, re-run tests with `UPDATE_SNAPS=clean cargo test`",
            it
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::caller::SourceLocation;
    use crate::testutil::{create_file, create_temp_dir, read_file, MockTestingT};
    use crate::types::{Config, Environment};

    const SHARED: &str =
        "\n[TestA - 1]\na\n---\n\n[TestA - 2]\nstale\n---\n\n[TestB - 1]\nb\n---\n";

    /// Run `TestA` once against `mock_test.snap` plus one standalone call.
    fn run(snaps: &Snaps, root: &Path) {
        let caller = SourceLocation::new(root.join("mock_test.rs"));
        let t = MockTestingT::new("TestA");
        let matcher = snaps.matcher(Config::default(), &t, caller);
        matcher.match_snapshot(&[&"a"]);
        matcher.match_standalone_snapshot(&"standalone");
        t.run_cleanups();
    }

    fn setup() -> (tempfile::TempDir, PathBuf) {
        let (tmp, root) = create_temp_dir();
        create_file(&root, "__snapshots__/mock_test.snap", SHARED.as_bytes());
        create_file(&root, "__snapshots__/TestA_1.snap", b"standalone");
        create_file(&root, "__snapshots__/TestA_2.snap", b"stale");
        create_file(&root, "__snapshots__/gone.snap", b"");
        create_file(&root, "__snapshots__/notes.md", b"");
        (tmp, root)
    }

    #[test]
    fn reports_obsolete_without_touching() {
        let (_tmp, root) = setup();
        let snaps = Snaps::new(Environment::new(false, ""));
        run(&snaps, &root);

        let report = snaps.clean(&CleanOptions::default()).unwrap();

        let dir = root.join("__snapshots__");
        assert_eq!(
            report.obsolete_files,
            vec![dir.join("TestA_2.snap"), dir.join("gone.snap")]
        );
        assert_eq!(report.obsolete_tests, vec!["TestA - 2", "TestB - 1"]);
        assert_eq!(report.passed, 2);
        assert!(!report.cleaned);
        assert_eq!(read_file(&dir.join("mock_test.snap")), SHARED);
        assert!(dir.join("gone.snap").exists());
    }

    #[test]
    fn clean_mode_removes() {
        let (_tmp, root) = setup();
        let snaps = Snaps::new(Environment::new(false, "clean"));
        run(&snaps, &root);

        let report = snaps.clean(&CleanOptions::default()).unwrap();

        let dir = root.join("__snapshots__");
        assert!(report.cleaned);
        assert_eq!(report.obsolete_tests.len(), 2);
        assert_eq!(read_file(&dir.join("mock_test.snap")), "\n[TestA - 1]\na\n---\n");
        assert!(!dir.join("gone.snap").exists());
        assert!(!dir.join("TestA_2.snap").exists());
        assert!(dir.join("TestA_1.snap").exists());
        assert!(dir.join("notes.md").exists());
    }

    #[test]
    fn skipped_and_filtered_tests_are_kept() {
        let (_tmp, root) = setup();
        let snaps = Snaps::new(Environment::new(false, "clean"));
        run(&snaps, &root);
        snaps.skips().add("TestB");

        let opts = CleanOptions::default().run_filter("TestA|gone");
        let report = snaps.clean(&opts).unwrap();

        assert_eq!(report.obsolete_tests, vec!["TestA - 2"]);
        assert_eq!(report.skipped, 1);
        assert!(read_file(&root.join("__snapshots__/mock_test.snap")).contains("[TestB - 1]"));
    }

    #[test]
    fn ci_never_removes() {
        let (_tmp, root) = setup();
        let snaps = Snaps::new(Environment::new(true, "clean"));
        run(&snaps, &root);

        let report = snaps.clean(&CleanOptions::default().sort(true)).unwrap();
        assert!(!report.cleaned);
        assert!(root.join("__snapshots__/gone.snap").exists());
    }

    #[test]
    fn invalid_run_filter_is_an_error() {
        let snaps = Snaps::new(Environment::default());
        let err = snaps.clean(&CleanOptions::default().run_filter("(")).unwrap_err();
        assert!(matches!(err, crate::SnapError::InvalidRunFilter { .. }));
    }

    #[test]
    fn summary_lists_everything() {
        let report = CleanReport {
            obsolete_files: vec![PathBuf::from("__snapshots__/gone.snap")],
            obsolete_tests: vec!["TestA - 2".to_string(), "TestB - 1".to_string()],
            passed: 3,
            failed: 1,
            added: 0,
            updated: 1,
            skipped: 0,
            cleaned: false,
        };

        assert_eq!(
            summary(&report),
            "\nSnapshot Summary\n\n\
             ✓ 3 snapshots passed\n\
             ✕ 1 snapshot failed\n\
             ✎ 1 snapshot updated\n\
             \n› 1 snapshot file obsolete\n\
             \x20 ↳ • __snapshots__/gone.snap\n\
             \n› 2 snapshot tests obsolete\n\
             \x20 ↳ • TestA - 2\n\
             \x20 ↳ • TestB - 1\n\
             \nTo remove them, re-run tests with `UPDATE_SNAPS=clean cargo test`\n"
        );
    }

    #[test]
    fn summary_in_clean_mode() {
        let report = CleanReport {
            obsolete_tests: vec!["TestA - 2".to_string()],
            cleaned: true,
            ..Default::default()
        };
        assert_eq!(
            summary(&report),
            "\nSnapshot Summary\n\n\n› 1 snapshot test removed\n  ↳ • TestA - 2\n"
        );
        assert_eq!(summary(&CleanReport::default()), "");
    }

    #[test]
    fn report_serializes() {
        let report = CleanReport {
            passed: 1,
            ..Default::default()
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["passed"], 1);
        assert_eq!(value["obsolete_files"], serde_json::json!([]));
    }

    #[test]
    fn files_of_other_test_binaries_are_kept() {
        let (_tmp, root) = create_temp_dir();
        let tests = root.join("tests");
        create_file(&tests, "a.rs", b"#[test]\nfn a_test() {}\n");
        create_file(&tests, "b.rs", b"#[test]\nfn b_test() {}\n\n#[test]\nfn copy() {}\n");
        create_file(&tests, "__snapshots__/a.snap", b"\n[a_test - 1]\na\n---\n");
        create_file(&tests, "__snapshots__/b.snap", b"\n[b_test - 1]\nb\n---\n");
        create_file(&tests, "__snapshots__/copy_1.snap", b"b");
        create_file(&tests, "__snapshots__/a_gone_1.snap", b"");
        create_file(&tests, "__snapshots__/removed.snap", b"");

        let snaps = Snaps::new(Environment::new(false, "clean")).with_id_prefix("");
        let t = MockTestingT::new("a_test");
        let caller = SourceLocation::new(tests.join("a.rs"));
        snaps.matcher(Config::default(), &t, caller).match_snapshot(&[&"a"]);
        t.run_cleanups();

        let report = snaps.clean(&CleanOptions::default()).unwrap();

        let dir = tests.join("__snapshots__");
        assert_eq!(
            report.obsolete_files,
            vec![dir.join("a_gone_1.snap"), dir.join("removed.snap")]
        );
        assert!(report.obsolete_tests.is_empty());
        assert_eq!(read_file(&dir.join("b.snap")), "\n[b_test - 1]\nb\n---\n");
        assert!(dir.join("copy_1.snap").exists());
        assert!(!dir.join("a_gone_1.snap").exists());
        assert!(!dir.join("removed.snap").exists());
    }

    #[test]
    fn standalone_names_and_bases() {
        let generic = ["/t/__snapshots__/TestA_%d.snap".to_string()];
        assert_eq!(standalone_names(generic.iter()), HashSet::from(["TestA".to_string()]));
        assert_eq!(standalone_base("nested_child_12"), Some("nested_child"));
        assert_eq!(standalone_base("users"), None);
        assert_eq!(standalone_base("users_x"), None);
    }
}
