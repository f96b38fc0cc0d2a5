//! Regular-file listing of a single directory.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, ArtifactError};

/// The regular files present in a directory at one instant.
///
/// Only the top level is listed; directories, symlinks and special files are
/// left out. Names are kept as the OS returned them, so files whose names are
/// not valid UTF-8 are still tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySnapshot {
    root: PathBuf,
    files: Vec<OsString>,
    index: HashSet<OsString>,
}

impl DirectorySnapshot {
    /// Directory the snapshot was taken against (canonical when resolvable).
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File names in enumeration order.
    pub fn files(&self) -> &[OsString] {
        &self.files
    }

    pub fn contains(&self, name: impl AsRef<OsStr>) -> bool {
        self.index.contains(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub(crate) fn same_root(&self, other: &DirectorySnapshot) -> bool {
        self.root == other.root
    }
}

/// List the regular files in `path`.
///
/// Fails only if the directory itself cannot be read. Entries that vanish or
/// cannot be inspected between listing and stat are skipped.
pub fn snapshot(path: &Path) -> Result<DirectorySnapshot, ArtifactError> {
    let entries = fs::read_dir(path).map_err(|e| io_err(path, e))?;
    let root = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

    let mut files = Vec::new();
    let mut index = HashSet::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };

        // symlink_metadata: links are never followed, so a link to a file is excluded.
        let metadata = match fs::symlink_metadata(entry.path()) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => continue,
            Err(err) => {
                tracing::debug!(path = %entry.path().display(), error = %err, "skipping entry");
                continue;
            }
        };
        if !metadata.file_type().is_file() {
            continue;
        }

        let name = entry.file_name();
        if index.insert(name.clone()) {
            files.push(name);
        }
    }

    Ok(DirectorySnapshot { root, files, index })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn lists_only_regular_files() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("a.txt"), "a").expect("write");
        fs::write(dir.path().join("b.bin"), [0u8, 1, 2]).expect("write");
        fs::create_dir(dir.path().join("nested")).expect("mkdir");
        fs::write(dir.path().join("nested").join("inner.txt"), "x").expect("write");

        let snap = snapshot(dir.path()).expect("snapshot");
        let mut files = snap.files().to_vec();
        files.sort();
        assert_eq!(files, ["a.txt", "b.bin"]);
        assert!(!snap.contains("nested"));
        assert!(!snap.contains("inner.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_excluded() {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("target.txt"), "t").expect("write");
        std::os::unix::fs::symlink(dir.path().join("target.txt"), dir.path().join("link.txt"))
            .expect("symlink");
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("dangling"))
            .expect("symlink");

        let snap = snapshot(dir.path()).expect("snapshot");
        assert_eq!(snap.files(), ["target.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_names_are_listed() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().expect("tempdir");
        let raw = OsStr::from_bytes(b"out-\xff.bin");
        fs::write(dir.path().join(raw), "x").expect("write");

        let snap = snapshot(dir.path()).expect("snapshot");
        assert_eq!(snap.len(), 1);
        assert!(snap.contains(raw));
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("gone");
        let err = snapshot(&missing).unwrap_err();
        assert!(matches!(err, ArtifactError::Io { .. }), "got: {err}");
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn empty_directory_yields_empty_snapshot() {
        let dir = TempDir::new().expect("tempdir");
        let snap = snapshot(dir.path()).expect("snapshot");
        assert!(snap.is_empty());
        assert_eq!(snap.len(), 0);
    }
}
