//! Workitem lifecycle controller.
//!
//! `Disconnected → Connecting → SignedIn → QueueRegistered → Polling ⇄ Draining(item)`
//!
//! Events from the queue service arrive through an [`EventInbox`] and are
//! handled one at a time on the controller's own task, so items never run
//! concurrently. Each drained item is snapshotted, executed, diffed,
//! reconciled and cleaned up before the next pop.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::time::Instant;

use wiq_artifacts::{cleanup, new_since, snapshot, DirectorySnapshot};
use wiq_core::{WorkItem, WorkerConfig};

use crate::client::{PopRequest, QueueClient};
use crate::error::WorkerError;
use crate::event::{event_channel, EventInbox, EventSink, SessionEvent, WorkerEvent};
use crate::executor::{run_executor, Executor};
use crate::reconciler::{reconcile, ReconcileResult};
use crate::session::{ControllerState, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Idle between triggers until shutdown.
    #[default]
    Forever,
    /// Stop after the first completed drain cycle.
    UntilIdle,
}

/// Shutdown signal checked between items and while idle.
#[derive(Debug)]
pub struct Shutdown {
    rx: broadcast::Receiver<()>,
    requested: bool,
    _keepalive: Option<broadcast::Sender<()>>,
}

impl Shutdown {
    /// Any message, or every sender being dropped, requests shutdown.
    pub fn new(rx: broadcast::Receiver<()>) -> Self {
        Self {
            rx,
            requested: false,
            _keepalive: None,
        }
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = broadcast::channel(1);
        Self {
            rx,
            requested: false,
            _keepalive: Some(tx),
        }
    }

    pub fn is_requested(&mut self) -> bool {
        if !self.requested && !matches!(self.rx.try_recv(), Err(TryRecvError::Empty)) {
            self.requested = true;
        }
        self.requested
    }

    async fn wait(&mut self) {
        if !self.requested {
            let _ = self.rx.recv().await;
            self.requested = true;
        }
    }
}

/// One pass of popping until the queue reports empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainSummary {
    pub wiq: String,
    pub items: usize,
    pub updated: usize,
    pub update_failures: usize,
    pub attachments: usize,
    pub unattached: usize,
    /// Shutdown was requested before the queue reported empty.
    pub stopped_early: bool,
    pub duration_ms: u128,
}

impl DrainSummary {
    fn new(wiq: &str) -> Self {
        Self {
            wiq: wiq.to_string(),
            ..Self::default()
        }
    }

    fn record(&mut self, result: &ReconcileResult) {
        self.items += 1;
        if result.is_updated() {
            self.updated += 1;
            self.unattached += result.unattached().len();
        } else {
            self.update_failures += 1;
        }
        self.attachments += result.attachments.len();
    }
}

/// Totals over a controller's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerReport {
    pub cycles: usize,
    pub items: usize,
    pub updated: usize,
    pub update_failures: usize,
    pub attachments: usize,
}

impl WorkerReport {
    fn record(&mut self, summary: &DrainSummary) {
        self.cycles += 1;
        self.items += summary.items;
        self.updated += summary.updated;
        self.update_failures += summary.update_failures;
        self.attachments += summary.attachments;
    }
}

pub struct Controller {
    client: Arc<dyn QueueClient>,
    executor: Arc<dyn Executor>,
    config: WorkerConfig,
    session: Session,
    sink: EventSink,
    inbox: EventInbox,
    shutdown: Shutdown,
    mode: RunMode,
    report: WorkerReport,
}

impl Controller {
    pub fn new(
        client: Arc<dyn QueueClient>,
        executor: Arc<dyn Executor>,
        config: WorkerConfig,
    ) -> Self {
        let (sink, inbox) = event_channel(config.event_capacity);
        Self {
            client,
            executor,
            session: Session::new(&config),
            config,
            sink,
            inbox,
            shutdown: Shutdown::never(),
            mode: RunMode::Forever,
            report: WorkerReport::default(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: broadcast::Receiver<()>) -> Self {
        self.shutdown = Shutdown::new(shutdown);
        self
    }

    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn report(&self) -> &WorkerReport {
        &self.report
    }

    /// Callback handle feeding this controller's event channel.
    pub fn event_sink(&self) -> EventSink {
        self.sink.clone()
    }

    /// Run until shutdown (or until idle in [`RunMode::UntilIdle`]).
    ///
    /// Only connection and event-subscription failures are returned as errors.
    pub async fn run(mut self) -> Result<WorkerReport, WorkerError> {
        self.start().await?;

        loop {
            if self.shutdown.is_requested() {
                tracing::info!("shutdown requested, stopping worker");
                break;
            }
            if self.mode == RunMode::UntilIdle && self.report.cycles > 0 {
                tracing::info!("queue drained, stopping worker");
                break;
            }

            let event = tokio::select! {
                _ = self.shutdown.wait() => continue,
                Some(event) = self.inbox.recv() => event,
            };
            self.handle_event(event).await;
        }

        self.client.disconnect().await;
        self.session.transition(ControllerState::Disconnected);
        Ok(self.report)
    }

    /// Connect and subscribe to session events.
    pub async fn start(&mut self) -> Result<(), WorkerError> {
        self.session.transition(ControllerState::Connecting);
        tracing::info!("Connecting to queue service...");
        if let Err(err) = self.client.connect().await {
            tracing::error!("Failed to connect: {err}");
            self.session.transition(ControllerState::Disconnected);
            return Err(WorkerError::Connect(err));
        }
        tracing::info!("Connected successfully");

        match self.client.on_session_event(self.event_sink()).await {
            Ok(id) => {
                tracing::info!("Client event callback registered: {id}");
                self.session.set_subscription(id);
                Ok(())
            }
            Err(err) => {
                tracing::error!("Failed to register client event callback: {err}");
                self.client.disconnect().await;
                self.session.transition(ControllerState::Disconnected);
                Err(WorkerError::EventSubscription(err))
            }
        }
    }

    /// Wait for the next collaborator event, session events first.
    ///
    /// With [`Controller::start`] and [`Controller::handle_event`] this steps
    /// the controller one event at a time instead of handing it to
    /// [`Controller::run`]. Never returns `None` while the controller is alive,
    /// since it keeps a sink of its own.
    pub async fn next_event(&mut self) -> Option<WorkerEvent> {
        self.inbox.recv().await
    }

    /// Apply one event to the state machine, draining when it calls for it.
    pub async fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Session(SessionEvent::SignedIn) => {
                tracing::info!("Signed in successfully, connecting to queue");
                self.session.transition(ControllerState::SignedIn);
                if self.register().await {
                    self.drain().await;
                }
            }
            WorkerEvent::Session(SessionEvent::Disconnected) => {
                tracing::warn!("session lost, waiting for sign-in");
                self.session.on_disconnected();
            }
            WorkerEvent::Session(SessionEvent::Other(name)) => {
                tracing::debug!(event = %name, "ignoring session event");
            }
            WorkerEvent::QueueAvailable { queue } => {
                if !self.session.is_registered() {
                    tracing::debug!(queue = %queue, "queue event before registration, ignoring");
                } else if queue != self.session.queue() {
                    tracing::debug!(queue = %queue, "queue event for another queue, ignoring");
                } else {
                    tracing::info!("Queue event received");
                    self.drain().await;
                }
            }
        }
    }

    /// Register the configured queue. A failure is logged and ends this cycle.
    pub async fn register(&mut self) -> bool {
        let queue = self.session.queue().to_string();
        tracing::info!("Registering queue: {queue}");
        match self.client.register_queue(&queue, self.event_sink()).await {
            Ok(registered) => {
                tracing::info!("Consuming queue: {}", registered.queuename);
                self.session.on_registered(registered);
                true
            }
            Err(err) => {
                tracing::error!("Failed to register queue: {err}");
                false
            }
        }
    }

    /// Pop and process items until the queue is empty, a pop or snapshot
    /// fails, or shutdown is requested.
    pub async fn drain(&mut self) -> DrainSummary {
        let started = Instant::now();
        let wiq = self.session.wiq().to_string();
        let mut summary = DrainSummary::new(&wiq);
        self.session.transition(ControllerState::Polling);

        loop {
            if self.shutdown.is_requested() {
                summary.stopped_early = true;
                break;
            }

            // Cleanup can only tell artifacts from existing files with a baseline.
            let before = match snapshot(&self.config.workdir) {
                Ok(before) => before,
                Err(err) => {
                    tracing::error!(error = %err, "Failed to list files");
                    break;
                }
            };

            tracing::info!("Popping workitem from queue");
            let request = PopRequest {
                wiq: wiq.clone(),
                wiqid: None,
                workdir: self.config.workdir.clone(),
            };
            let item = match self.client.pop_workitem(&request).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    tracing::info!("No more workitems in queue");
                    break;
                }
                Err(err) => {
                    tracing::error!(error = %err, "failed to pop workitem");
                    break;
                }
            };

            tracing::info!(item_id = %item.id, "Workitem popped successfully");
            let result = self.process(item, &before).await;
            summary.record(&result);
        }

        if summary.items > 0 {
            tracing::info!("No more workitems in {wiq} workitem queue");
        } else {
            tracing::debug!(wiq = %wiq, "drain cycle found no workitems");
        }

        summary.duration_ms = started.elapsed().as_millis();
        self.report.record(&summary);
        self.session.transition(ControllerState::QueueRegistered);
        summary
    }

    async fn process(&mut self, item: WorkItem, before: &DirectorySnapshot) -> ReconcileResult {
        let workdir: &Path = &self.config.workdir;
        self.session
            .transition(ControllerState::Draining(item.id.clone()));
        tracing::info!("Starting processing of workitem {}", item.id);

        let outcome = run_executor(self.executor.clone(), &item, workdir).await;

        let artifacts = match new_since(before, workdir) {
            Ok(artifacts) => artifacts,
            Err(err) => {
                tracing::error!(item_id = %item.id, error = %err, "failed to collect new files");
                Vec::new()
            }
        };

        let result = reconcile(self.client.as_ref(), workdir, item, &outcome, artifacts).await;

        let cleaned = cleanup(before, workdir);
        if !cleaned.is_clean() {
            tracing::warn!(
                item_id = %result.item.id,
                failed = cleaned.failed.len(),
                "working directory not fully restored",
            );
        }

        self.session.record_item();
        self.session.transition(ControllerState::Polling);
        result
    }
}
