//! Artifact discovery by snapshot difference.

use std::ffi::OsString;
use std::path::Path;

use crate::error::ArtifactError;
use crate::snapshot::{snapshot, DirectorySnapshot};

/// Files in `after` that are not in `before`, in `after`'s enumeration order.
///
/// Enumeration order is whatever the OS returned; callers comparing results
/// should treat them as a set.
pub fn diff(
    before: &DirectorySnapshot,
    after: &DirectorySnapshot,
) -> Result<Vec<OsString>, ArtifactError> {
    if !before.same_root(after) {
        return Err(ArtifactError::RootMismatch {
            before: before.root().to_path_buf(),
            after: after.root().to_path_buf(),
        });
    }

    Ok(after
        .files()
        .iter()
        .filter(|name| !before.contains(name))
        .cloned()
        .collect())
}

/// Snapshot `path` now and diff it against `before`.
pub fn new_since(
    before: &DirectorySnapshot,
    path: &Path,
) -> Result<Vec<OsString>, ArtifactError> {
    let after = snapshot(path)?;
    diff(before, &after)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn as_set(names: Vec<OsString>) -> BTreeSet<OsString> {
        names.into_iter().collect()
    }

    #[test]
    fn back_to_back_snapshots_have_no_diff() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("keep.txt"), "k").expect("write");

        let first = snapshot(dir.path()).expect("first");
        let second = snapshot(dir.path()).expect("second");
        assert!(diff(&first, &second).expect("diff").is_empty());
    }

    #[test]
    fn new_files_are_reported_and_existing_ones_are_not() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("keep.txt"), "k").expect("write");
        let before = snapshot(dir.path()).expect("before");

        fs::write(dir.path().join("keep.txt"), "modified").expect("rewrite");
        fs::write(dir.path().join("out-1.csv"), "1").expect("write");
        fs::write(dir.path().join("out-2.csv"), "2").expect("write");
        fs::create_dir(dir.path().join("scratch")).expect("mkdir");

        let found = new_since(&before, dir.path()).expect("new_since");
        assert_eq!(
            as_set(found),
            BTreeSet::from([OsString::from("out-1.csv"), OsString::from("out-2.csv")])
        );
    }

    #[test]
    fn removed_files_are_not_reported() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("old.txt"), "o").expect("write");
        let before = snapshot(dir.path()).expect("before");

        fs::remove_file(dir.path().join("old.txt")).expect("remove");
        assert!(new_since(&before, dir.path()).expect("new_since").is_empty());
    }

    #[test]
    fn snapshots_of_different_directories_do_not_compare() {
        let left = TempDir::new().expect("left");
        let right = TempDir::new().expect("right");
        let before = snapshot(left.path()).expect("before");
        let after = snapshot(right.path()).expect("after");

        let err = diff(&before, &after).unwrap_err();
        assert!(matches!(err, ArtifactError::RootMismatch { .. }), "got: {err}");
    }
}
