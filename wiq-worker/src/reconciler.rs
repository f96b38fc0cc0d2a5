//! Finalise a workitem and hand it back to the queue service.
//!
//! `reconcile` resolves the item, builds one descriptor per new file and
//! issues exactly one update call. A failed update is logged and reported,
//! never retried here; redelivery is up to the queue service.

use std::ffi::OsString;
use std::path::Path;

use wiq_core::{ArtifactDescriptor, ExecutionOutcome, WorkItem};

use crate::client::{QueueClient, UpdateRequest};
use crate::error::UpdateError;

#[derive(Debug)]
pub enum ReconcileStatus {
    /// The queue service accepted the update. `unattached` lists files it
    /// did not store.
    Updated { unattached: Vec<String> },
    Failed(UpdateError),
}

#[derive(Debug)]
pub struct ReconcileResult {
    /// The resolved item, as returned by the queue service when the update succeeded.
    pub item: WorkItem,
    pub attachments: Vec<ArtifactDescriptor>,
    pub status: ReconcileStatus,
}

impl ReconcileResult {
    pub fn is_updated(&self) -> bool {
        matches!(self.status, ReconcileStatus::Updated { .. })
    }

    pub fn unattached(&self) -> &[String] {
        match &self.status {
            ReconcileStatus::Updated { unattached } => unattached,
            ReconcileStatus::Failed(_) => &[],
        }
    }
}

pub async fn reconcile(
    client: &dyn QueueClient,
    workdir: &Path,
    item: WorkItem,
    outcome: &ExecutionOutcome,
    new_artifacts: Vec<OsString>,
) -> ReconcileResult {
    let item = item.resolve(outcome);
    match outcome {
        ExecutionOutcome::Success => tracing::info!("Workitem processed successfully"),
        _ => tracing::info!(
            item_id = %item.id,
            state = %item.state(),
            "Workitem processing failed"
        ),
    }

    let files: Vec<ArtifactDescriptor> = new_artifacts
        .into_iter()
        .map(|name| match name.into_string() {
            Ok(name) => ArtifactDescriptor::new(name),
            Err(raw) => {
                let lossy = raw.to_string_lossy().into_owned();
                tracing::warn!(file = %lossy, "file name is not valid UTF-8, reporting it lossily");
                ArtifactDescriptor::new(lossy)
            }
        })
        .collect();
    if !files.is_empty() {
        tracing::info!("Found {} new files to attach", files.len());
    }

    let request = UpdateRequest {
        item: item.clone(),
        files: files.clone(),
        ignore_max_retries: false,
        workdir: workdir.to_path_buf(),
    };

    match client.update_workitem(request).await {
        Ok(response) => {
            tracing::info!(item_id = %response.item.id, state = %response.item.state(), "Workitem updated successfully");
            let unattached: Vec<String> = response
                .files
                .iter()
                .filter(|file| !file.is_attached())
                .map(|file| file.filename.clone())
                .collect();
            for name in &unattached {
                tracing::warn!(item_id = %response.item.id, file = %name, "file was not attached");
            }
            ReconcileResult {
                item: response.item,
                attachments: response.files,
                status: ReconcileStatus::Updated { unattached },
            }
        }
        Err(err) => {
            tracing::error!(item_id = %item.id, "Failed to update workitem: {err}");
            ReconcileResult {
                item,
                attachments: files,
                status: ReconcileStatus::Failed(err),
            }
        }
    }
}
