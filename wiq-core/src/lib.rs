//! wiq core library — workitem domain types and worker configuration.
//!
//! - [`types`] — workitems, outcomes, artifact descriptors
//! - [`config`] — environment-driven [`WorkerConfig`]

pub mod config;
pub mod types;

pub use config::WorkerConfig;
pub use types::{
    ArtifactDescriptor, ExecutionOutcome, ItemFailure, WorkItem, WorkItemId, WorkItemState,
};
