use std::sync::Arc;

use tokio::sync::broadcast;

use wiq_core::WorkerConfig;

use crate::client::QueueClient;
use crate::controller::{Controller, RunMode, WorkerReport};
use crate::error::{io_err, WorkerError};
use crate::executor::Executor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Start the worker and block the current thread until it exits.
pub fn start_blocking(
    client: Arc<dyn QueueClient>,
    executor: Arc<dyn Executor>,
    config: WorkerConfig,
    mode: RunMode,
    log_format: LogFormat,
) -> Result<WorkerReport, WorkerError> {
    init_tracing(log_format);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(client, executor, config, mode))
}

/// Run a controller until it stops or ctrl-c is received.
pub async fn run(
    client: Arc<dyn QueueClient>,
    executor: Arc<dyn Executor>,
    config: WorkerConfig,
    mode: RunMode,
) -> Result<WorkerReport, WorkerError> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(16);

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("received ctrl-c, finishing current workitem");
                    let _ = shutdown.send(());
                }
                Err(err) => tracing::warn!(error = %err, "ctrl-c handler failed"),
            }
        })
    };

    let controller = Controller::new(client, executor, config)
        .with_mode(mode)
        .with_shutdown(shutdown_rx);
    let controller_handle = tokio::spawn(controller.run());

    let result = controller_handle.await;
    signal_handle.abort();
    drop(shutdown_tx);

    match result {
        Ok(inner) => inner,
        Err(err) => Err(WorkerError::Join(format!("controller task join failure: {err}"))),
    }
}

/// Install the global subscriber. Logs go to stderr; `RUST_LOG` overrides
/// the default `info` filter.
pub fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
