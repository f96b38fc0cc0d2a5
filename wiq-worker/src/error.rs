use std::path::PathBuf;

use thiserror::Error;
use wiq_core::WorkItemId;

/// Establishing the session or its event subscription failed. Process-fatal.
#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("queue service unavailable: {0}")]
    Unavailable(String),

    #[error("rejected by queue service: {0}")]
    Rejected(String),
}

/// Registering interest in a queue failed. Ends the current cycle only.
#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("queue service unavailable: {0}")]
    Unavailable(String),

    #[error("queue '{queue}' rejected: {reason}")]
    Rejected { queue: String, reason: String },
}

/// Popping failed. Treated as "no more items" for the current cycle.
#[derive(Debug, Error)]
pub enum PopError {
    #[error("queue service unavailable: {0}")]
    Unavailable(String),

    #[error("pop from '{wiq}' rejected: {reason}")]
    Rejected { wiq: String, reason: String },
}

/// The update call failed. Logged; never retried by the worker.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("queue service unavailable: {0}")]
    Unavailable(String),

    #[error("update of workitem {id} rejected: {reason}")]
    Rejected { id: WorkItemId, reason: String },
}

/// Error surface of the worker runtime.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("failed to connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("failed to register client event callback: {0}")]
    EventSubscription(ConnectError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("task join failure: {0}")]
    Join(String),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> WorkerError {
    WorkerError::Io {
        path: path.into(),
        source,
    }
}
