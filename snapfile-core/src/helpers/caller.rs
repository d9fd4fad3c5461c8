//! Location of the test source file that made a snapshot call.
//!
//! Rust has no runtime caller introspection, so the location is passed
//! explicitly: the `snapfile` macros capture `file!()` and the crate's
//! manifest directory at the call site.

use std::path::{Path, PathBuf};

/// Source file of a snapshot call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    file: PathBuf,
}

impl SourceLocation {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self { file: file.into() }
    }

    /// Resolve a `file!()` path to an absolute one.
    ///
    /// `file!()` is relative to the workspace root for workspace members and
    /// to the package root otherwise, so the manifest directory and each of
    /// its ancestors are tried in turn.
    pub fn resolve(file: &str, manifest_dir: &str) -> Self {
        let path = Path::new(file);
        if path.is_absolute() {
            return Self::new(path);
        }

        let manifest_dir = Path::new(manifest_dir);
        for base in manifest_dir.ancestors() {
            let candidate = base.join(path);
            if candidate.is_file() {
                return Self::new(candidate);
            }
        }

        log::debug!(
            "Could not locate {} from {}, assuming it is relative to the manifest",
            file,
            manifest_dir.display()
        );
        Self::new(manifest_dir.join(path))
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Directory holding the source file.
    pub fn dir(&self) -> &Path {
        self.file.parent().unwrap_or_else(|| Path::new(""))
    }

    /// File name without extension, e.g. `users` for `tests/users.rs`.
    pub fn stem(&self) -> String {
        self.file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{create_file, create_temp_dir};

    #[test]
    fn resolves_against_ancestors() {
        let (_tmp, root) = create_temp_dir();
        let member = root.join("member");
        create_file(&member, "tests/users.rs", b"");

        // workspace-relative file!() seen from the member manifest
        let loc = SourceLocation::resolve("member/tests/users.rs", member.to_str().unwrap());
        assert_eq!(loc.file(), member.join("tests/users.rs"));

        // package-relative file!()
        let loc = SourceLocation::resolve("tests/users.rs", member.to_str().unwrap());
        assert_eq!(loc.file(), member.join("tests/users.rs"));
        assert_eq!(loc.dir(), member.join("tests"));
        assert_eq!(loc.stem(), "users");
    }

    #[test]
    fn falls_back_to_manifest_dir() {
        let loc = SourceLocation::resolve("tests/missing.rs", "/nonexistent/crate");
        assert_eq!(loc.file(), Path::new("/nonexistent/crate/tests/missing.rs"));
    }

    #[test]
    fn absolute_paths_kept() {
        let loc = SourceLocation::resolve("/abs/tests/a.rs", "/ignored");
        assert_eq!(loc.file(), Path::new("/abs/tests/a.rs"));
    }
}
