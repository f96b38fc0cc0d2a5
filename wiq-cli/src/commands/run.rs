//! `wiq run` — drain a local queue with the reference executor.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use wiq_core::WorkerConfig;
use wiq_worker::{start_blocking, HelloExecutor, LogFormat, MemoryQueue, RunMode};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum LogFormatArg {
    #[default]
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

/// Arguments for `wiq run`.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON array of workitems to seed the local queue with.
    #[arg(long)]
    pub items: PathBuf,

    /// Workitem queue to pop from (overrides `wiq`).
    #[arg(long)]
    pub wiq: Option<String>,

    /// Queue name to register (overrides `queue`).
    #[arg(long)]
    pub queue: Option<String>,

    /// Working directory for the executor (overrides `WIQ_WORKDIR`).
    #[arg(long)]
    pub workdir: Option<PathBuf>,

    /// Exit once the queue has been drained instead of waiting for ctrl-c.
    #[arg(long)]
    pub once: bool,

    #[arg(long, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

impl RunArgs {
    pub fn run(self) -> Result<()> {
        let mut config = WorkerConfig::from_env();
        if let Some(wiq) = self.wiq {
            config = config.with_wiq(wiq);
        }
        if let Some(queue) = self.queue {
            config = config.with_queue(queue);
        }
        if let Some(workdir) = self.workdir {
            config = config.with_workdir(workdir);
        }

        let queue = Arc::new(
            MemoryQueue::from_json_file(&self.items, &config.wiq)
                .with_context(|| format!("failed to load workitems from {}", self.items.display()))?,
        );
        let mode = if self.once {
            RunMode::UntilIdle
        } else {
            RunMode::Forever
        };

        let report = start_blocking(
            queue.clone(),
            Arc::new(HelloExecutor),
            config,
            mode,
            self.log_format.into(),
        )
        .context("worker exited with error")?;

        for update in queue.updates() {
            println!(
                "{}",
                serde_json::to_string(&update).context("failed to render update JSON")?
            );
        }
        println!(
            "{}",
            serde_json::to_string(&report).context("failed to render report JSON")?
        );
        Ok(())
    }
}
