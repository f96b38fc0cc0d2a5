//! Per-item business logic.
//!
//! An [`Executor`] sees the item read-only and reports an
//! [`ExecutionOutcome`]; writing the outcome onto the item is the
//! reconciler's job. Executors may create files in the working directory;
//! the controller collects and removes them afterwards.

use std::any::Any;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use wiq_core::{ExecutionOutcome, WorkItem};

/// File written by [`HelloExecutor`].
pub const HELLO_FILE: &str = "hello.txt";
const HELLO_CONTENT: &str = "Hello kitty";

pub trait Executor: Send + Sync + 'static {
    fn execute(&self, item: &WorkItem, workdir: &Path) -> ExecutionOutcome;
}

/// Placeholder logic: writes [`HELLO_FILE`] and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelloExecutor;

impl Executor for HelloExecutor {
    fn execute(&self, item: &WorkItem, workdir: &Path) -> ExecutionOutcome {
        tracing::info!("Processing workitem id {}, retry #{}", item.id, item.retries);

        let path = workdir.join(HELLO_FILE);
        match fs::write(&path, HELLO_CONTENT) {
            Ok(()) => tracing::info!("Created {HELLO_FILE} file"),
            Err(err) => tracing::error!(path = %path.display(), error = %err, "Failed to create {HELLO_FILE} file"),
        }
        ExecutionOutcome::Success
    }
}

/// Executor backed by a closure.
pub struct FnExecutor<F>(F);

impl<F> Executor for FnExecutor<F>
where
    F: Fn(&WorkItem, &Path) -> ExecutionOutcome + Send + Sync + 'static,
{
    fn execute(&self, item: &WorkItem, workdir: &Path) -> ExecutionOutcome {
        (self.0)(item, workdir)
    }
}

pub fn from_fn<F>(f: F) -> FnExecutor<F>
where
    F: Fn(&WorkItem, &Path) -> ExecutionOutcome + Send + Sync + 'static,
{
    FnExecutor(f)
}

/// Run `executor` on the blocking pool. A panic becomes a retryable outcome.
pub(crate) async fn run_executor(
    executor: Arc<dyn Executor>,
    item: &WorkItem,
    workdir: &Path,
) -> ExecutionOutcome {
    let item = item.clone();
    let workdir = workdir.to_path_buf();
    let id = item.id.clone();

    match tokio::task::spawn_blocking(move || executor.execute(&item, &workdir)).await {
        Ok(outcome) => outcome,
        Err(err) => {
            let reason = if err.is_panic() {
                panic_message(err.into_panic())
            } else {
                err.to_string()
            };
            tracing::error!(item_id = %id, reason = %reason, "executor failed");
            ExecutionOutcome::retry("application", format!("Processing failed: {reason}"), "executor")
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "executor panicked".to_string()
    }
}
