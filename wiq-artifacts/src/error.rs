//! Error types for wiq-artifacts.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    /// The directory could not be opened for listing.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshots were taken against different directories.
    #[error("snapshots are not comparable: {before} vs {after}")]
    RootMismatch { before: PathBuf, after: PathBuf },
}

/// Convenience constructor for [`ArtifactError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.into(),
        source,
    }
}
