//! # wiq-artifacts
//!
//! Working-directory snapshots and artifact discovery.
//!
//! Take a [`snapshot`] before an item runs, then call [`new_since`] to find
//! the files it produced and [`cleanup`] to delete them again.

pub mod cleanup;
pub mod diff;
pub mod error;
pub mod snapshot;

pub use cleanup::{cleanup, CleanupReport};
pub use diff::{diff, new_since};
pub use error::ArtifactError;
pub use snapshot::{snapshot, DirectorySnapshot};
