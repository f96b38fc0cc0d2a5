//! Restore a working directory to an earlier snapshot by deleting new files.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::diff::new_since;
use crate::snapshot::DirectorySnapshot;

/// What a cleanup pass did. Cleanup never fails as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files deleted (or already gone by the time of deletion).
    pub removed: Vec<OsString>,
    /// Files that could not be deleted.
    pub failed: Vec<OsString>,
    /// `false` when the directory could not be scanned at all.
    pub scanned: bool,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.scanned && self.failed.is_empty()
    }
}

/// Delete every regular file in `path` that is not part of `before`.
///
/// Scan and per-file errors are logged and recorded in the report.
pub fn cleanup(before: &DirectorySnapshot, path: &Path) -> CleanupReport {
    let mut report = CleanupReport::default();

    let leftovers = match new_since(before, path) {
        Ok(leftovers) => leftovers,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "cleanup scan failed");
            return report;
        }
    };
    report.scanned = true;

    for name in leftovers {
        let shown = name.to_string_lossy().into_owned();
        tracing::info!("Deleting file: {shown}");
        match fs::remove_file(path.join(&name)) {
            Ok(()) => report.removed.push(name),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(file = %shown, "file already removed");
                report.removed.push(name);
            }
            Err(err) => {
                tracing::warn!(file = %shown, error = %err, "failed to delete file");
                report.failed.push(name);
            }
        }
    }

    report
}
