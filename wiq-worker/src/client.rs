//! Boundary to the queue service.
//!
//! The transport, authentication and wire protocol live behind
//! [`QueueClient`]; the controller only sees these calls and the events
//! delivered through an [`EventSink`].

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use wiq_core::{ArtifactDescriptor, WorkItem};

use crate::error::{ConnectError, PopError, RegisterError, UpdateError};
use crate::event::EventSink;

/// A queue the worker is consuming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredQueue {
    pub queuename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopRequest {
    pub wiq: String,
    pub wiqid: Option<String>,
    /// Directory input files are downloaded into.
    pub workdir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub item: WorkItem,
    pub files: Vec<ArtifactDescriptor>,
    pub ignore_max_retries: bool,
    /// Directory `files` are relative to.
    pub workdir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResponse {
    pub item: WorkItem,
    /// Descriptors as stored; uploaded ones carry a `remote_id`.
    pub files: Vec<ArtifactDescriptor>,
}

#[async_trait]
pub trait QueueClient: Send + Sync {
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Subscribe to session events; returns the subscription id.
    async fn on_session_event(&self, sink: EventSink) -> Result<String, ConnectError>;

    /// Register interest in `queuename`; availability is reported through `sink`.
    async fn register_queue(
        &self,
        queuename: &str,
        sink: EventSink,
    ) -> Result<RegisteredQueue, RegisterError>;

    async fn pop_workitem(&self, request: &PopRequest) -> Result<Option<WorkItem>, PopError>;

    async fn update_workitem(&self, request: UpdateRequest) -> Result<UpdateResponse, UpdateError>;

    async fn disconnect(&self) {}
}
