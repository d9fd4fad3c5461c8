//! Assertions against a private context and a temporary snapshot directory.

use std::path::Path;

use snapfile::{Config, Environment, LibTest, Snaps, SourceLocation, TestingT};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn local(update: &str) -> Snaps {
    init_logging();
    Snaps::new(Environment::new(false, update)).with_id_prefix("")
}

fn caller(dir: &Path) -> SourceLocation {
    SourceLocation::new(dir.join("users.rs"))
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn creates_then_passes() {
    let tmp = tempfile::tempdir().unwrap();
    let snap = tmp.path().join("__snapshots__/users.snap");

    let snaps = local("");
    let t = LibTest::new("users/creates");
    snaps
        .matcher(Config::default(), &t, caller(tmp.path()))
        .match_snapshot(&[&10, &"hello world"]);
    t.finish();
    assert_eq!(read(&snap), "\n[users/creates - 1]\nint(10)\nhello world\n---\n");

    let snaps = local("");
    let t = LibTest::new("users/creates");
    snaps
        .matcher(Config::default(), &t, caller(tmp.path()))
        .match_snapshot(&[&10, &"hello world"]);
    t.finish();
}

#[test]
#[should_panic(expected = "at __snapshots__/users.snap:2")]
fn mismatch_panics_with_location() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("__snapshots__")).unwrap();
    std::fs::write(
        tmp.path().join("__snapshots__/users.snap"),
        "\n[users/diff - 1]\nint(10)\nhello world\n---\n",
    )
    .unwrap();

    let snaps = local("");
    let t = LibTest::new("users/diff");
    snaps
        .matcher(Config::default(), &t, caller(tmp.path()))
        .match_snapshot(&[&100, &"bye world"]);
    t.finish();
}

#[test]
fn update_mode_rewrites() {
    let tmp = tempfile::tempdir().unwrap();
    let snap = tmp.path().join("__snapshots__/users.snap");
    std::fs::create_dir_all(snap.parent().unwrap()).unwrap();
    std::fs::write(&snap, "\n[users/update - 1]\nint(10)\n---\n").unwrap();

    let snaps = local("true");
    let t = LibTest::new("users/update");
    snaps
        .matcher(Config::default(), &t, caller(tmp.path()))
        .match_snapshot(&[&11]);
    t.finish();

    assert_eq!(read(&snap), "\n[users/update - 1]\nint(11)\n---\n");
    assert_eq!(snaps.events().get(snapfile::TestEvent::Updated), 1);
}

#[test]
fn clean_mode_drops_stale_entries() {
    let tmp = tempfile::tempdir().unwrap();
    let snap = tmp.path().join("__snapshots__/users.snap");
    std::fs::create_dir_all(snap.parent().unwrap()).unwrap();
    std::fs::write(
        &snap,
        "\n[users/kept - 1]\nint(1)\n---\n\n[users/stale - 1]\nint(2)\n---\n",
    )
    .unwrap();

    let snaps = local("clean");
    let t = LibTest::new("users/kept");
    snaps
        .matcher(Config::default(), &t, caller(tmp.path()))
        .match_snapshot(&[&1]);
    t.finish();

    let report = snaps.clean(&snapfile::CleanOptions::default()).unwrap();
    assert_eq!(report.obsolete_tests, vec!["users/stale - 1"]);
    assert_eq!(read(&snap), "\n[users/kept - 1]\nint(1)\n---\n");
    assert!(snapfile::summary(&report).contains("1 snapshot test removed"));
}

#[test]
fn name_comes_from_libtest_thread() {
    assert_eq!(LibTest::current("unused").name(), "name_comes_from_libtest_thread");
}

#[test]
fn binaries_sharing_a_directory_keep_each_others_files() {
    let tmp = tempfile::tempdir().unwrap();
    let tests = tmp.path().join("tests");
    std::fs::create_dir_all(&tests).unwrap();
    std::fs::write(tests.join("a.rs"), "#[test]\nfn a_test() {}\n").unwrap();
    std::fs::write(tests.join("b.rs"), "#[test]\nfn b_test() {}\n").unwrap();

    let b = local("");
    let t = LibTest::new("b_test");
    let matcher = b.matcher(Config::default(), &t, SourceLocation::new(tests.join("b.rs")));
    matcher.match_snapshot(&[&"b"]);
    matcher.match_standalone_snapshot(&"b standalone");
    t.finish();

    let a = local("clean");
    let t = LibTest::new("a_test");
    a.matcher(Config::default(), &t, SourceLocation::new(tests.join("a.rs")))
        .match_snapshot(&[&"a"]);
    t.finish();
    let report = a.clean(&snapfile::CleanOptions::default()).unwrap();

    let dir = tests.join("__snapshots__");
    assert!(report.obsolete_files.is_empty(), "{:?}", report.obsolete_files);
    assert_eq!(read(&dir.join("a.snap")), "\n[a_test - 1]\na\n---\n");
    assert_eq!(read(&dir.join("b.snap")), "\n[b_test - 1]\nb\n---\n");
    assert_eq!(read(&dir.join("b_test_1.snap")), "b standalone");
}
