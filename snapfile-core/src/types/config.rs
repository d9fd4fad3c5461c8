//! Configuration for snapshot matching.
//!
//! Three layers:
//! - [`Config`]: options for one matcher instance (file name, directory, ...)
//! - [`Environment`]: process-wide toggles (CI detection, `UPDATE_SNAPS`)
//! - [`CleanOptions`]: options for the obsolete snapshot scan at process end

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::types::error::{Result, SnapError};

/// Default directory, relative to the calling test file, holding snapshots.
pub const DEFAULT_SNAPS_DIR: &str = "__snapshots__";

/// Fixed extension every snapshot file carries.
pub const SNAPS_EXT: &str = ".snap";

/// Environment variable toggling update mode.
pub const UPDATE_ENV_VAR: &str = "UPDATE_SNAPS";

/// Per-matcher configuration.
///
/// ```
/// use snapfile_core::Config;
///
/// let config = Config::default().filename("users").ext(".txt").sort_keys(true);
/// assert_eq!(config.get_filename(), Some("users"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    filename: Option<String>,
    snaps_dir: PathBuf,
    extension: String,
    update: Option<bool>,
    sort_keys: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            filename: None,
            snaps_dir: PathBuf::from(DEFAULT_SNAPS_DIR),
            extension: String::new(),
            update: None,
            sort_keys: false,
        }
    }
}

impl Config {
    /// Override the snapshot file base name.
    ///
    /// The extension is still `.snap`, see [`Config::ext`].
    pub fn filename(mut self, name: impl Into<String>) -> Self {
        self.filename = Some(name.into());
        self
    }

    /// Override the snapshot directory. Relative paths resolve against the
    /// directory of the calling test file.
    pub fn dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snaps_dir = dir.into();
        self
    }

    /// Extra suffix appended after `.snap`, e.g. `.txt` gives `name.snap.txt`.
    pub fn ext(mut self, ext: impl Into<String>) -> Self {
        self.extension = ext.into();
        self
    }

    /// Force update mode on or off for this matcher, overriding
    /// `UPDATE_SNAPS`. CI still wins.
    pub fn update(mut self, update: bool) -> Self {
        self.update = Some(update);
        self
    }

    /// Sort object keys in JSON snapshots.
    pub fn sort_keys(mut self, sort: bool) -> Self {
        self.sort_keys = sort;
        self
    }

    pub fn get_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn get_dir(&self) -> &Path {
        &self.snaps_dir
    }

    pub fn get_ext(&self) -> &str {
        &self.extension
    }

    pub fn get_update(&self) -> Option<bool> {
        self.update
    }

    pub fn get_sort_keys(&self) -> bool {
        self.sort_keys
    }
}

/// Process-wide toggles consulted by every matcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Running inside a CI system. Disables every kind of write.
    pub is_ci: bool,
    /// Raw value of `UPDATE_SNAPS`.
    pub update_var: String,
}

/// Variables whose presence marks a CI environment.
const CI_VARS: &[&str] = &[
    "CONTINUOUS_INTEGRATION",
    "BUILD_NUMBER",
    "RUN_ID",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "TF_BUILD",
    "JENKINS_URL",
    "BUILDKITE",
    "CIRCLECI",
    "TRAVIS",
    "TEAMCITY_VERSION",
];

impl Environment {
    pub fn new(is_ci: bool, update_var: impl Into<String>) -> Self {
        Self {
            is_ci,
            update_var: update_var.into(),
        }
    }

    /// Read CI detection and `UPDATE_SNAPS` from the process environment.
    pub fn from_env() -> Self {
        let env = Self {
            is_ci: detect_ci(|key| std::env::var(key).ok()),
            update_var: std::env::var(UPDATE_ENV_VAR).unwrap_or_default(),
        };
        log::debug!(
            "Snapshot environment: ci={}, {}={:?}",
            env.is_ci,
            UPDATE_ENV_VAR,
            env.update_var
        );
        env
    }

    /// Whether mismatching snapshots get rewritten. `config_update` is the
    /// matcher's own override.
    pub fn should_update(&self, config_update: Option<bool>) -> bool {
        if self.is_ci {
            return false;
        }

        config_update.unwrap_or(self.update_var == "true")
    }

    /// Whether obsolete files and entries get removed at process end.
    pub fn should_clean(&self) -> bool {
        !self.is_ci && (self.update_var == "true" || self.update_var == "clean")
    }
}

/// CI detection over well-known CI variables. `lookup` abstracts the
/// environment so detection can be tested without touching the process.
pub fn detect_ci(lookup: impl Fn(&str) -> Option<String>) -> bool {
    if let Some(ci) = lookup("CI") {
        return !ci.eq_ignore_ascii_case("false") && ci != "0";
    }

    CI_VARS.iter().any(|key| lookup(key).is_some())
}

/// Options for the obsolete snapshot scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    /// Regular expression selecting the tests that ran. Tests it excludes are
    /// treated as intentionally not exercised. Empty selects everything.
    pub run_filter: String,
    /// How many times the test suite ran in this process.
    pub count: usize,
    /// Rewrite shared files with entries in natural order.
    pub sort: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            run_filter: String::new(),
            count: 1,
            sort: false,
        }
    }
}

impl CleanOptions {
    /// Read `SNAPS_RUN_FILTER`, `SNAPS_COUNT` and `SNAPS_SORT`.
    pub fn from_env() -> Self {
        let mut opts = Self::default();
        if let Ok(filter) = std::env::var("SNAPS_RUN_FILTER") {
            opts.run_filter = filter;
        }
        if let Some(count) = std::env::var("SNAPS_COUNT")
            .ok()
            .and_then(|c| c.parse::<usize>().ok())
        {
            opts.count = count;
        }
        if let Ok(sort) = std::env::var("SNAPS_SORT") {
            opts.sort = sort == "true" || sort == "1";
        }
        opts
    }

    pub fn run_filter(mut self, filter: impl Into<String>) -> Self {
        self.run_filter = filter.into();
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn sort(mut self, sort: bool) -> Self {
        self.sort = sort;
        self
    }

    /// Compile the run filter. `None` when no filter is set.
    pub fn run_regex(&self) -> Result<Option<Regex>> {
        if self.run_filter.is_empty() {
            return Ok(None);
        }

        Regex::new(&self.run_filter)
            .map(Some)
            .map_err(|e| SnapError::InvalidRunFilter {
                pattern: self.run_filter.clone(),
                message: e.to_string(),
            })
    }

    /// Repeat count, never zero.
    pub fn effective_count(&self) -> usize {
        self.count.max(1)
    }
}
