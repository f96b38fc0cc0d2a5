//! In-process queue service.
//!
//! Implements [`QueueClient`] over in-memory queues. Used by the `wiq run`
//! command for local batches and by tests, with switches to inject the
//! failures a remote service can produce.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use async_trait::async_trait;
use serde::Serialize;
use wiq_core::{ArtifactDescriptor, WorkItem, WorkItemId, WorkItemState};

use crate::client::{PopRequest, QueueClient, RegisteredQueue, UpdateRequest, UpdateResponse};
use crate::error::{io_err, ConnectError, PopError, RegisterError, UpdateError, WorkerError};
use crate::event::{EventSink, DISCONNECTED, SIGNED_IN};

/// Redeliveries of a `retry` item before it is left as is.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// An accepted update, as stored by the queue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateRecord {
    pub item: WorkItem,
    pub files: Vec<ArtifactDescriptor>,
}

#[derive(Debug, Default)]
struct Faults {
    connect: bool,
    subscribe: bool,
    register_failures: u32,
    pop: bool,
    update_for: HashSet<WorkItemId>,
    rejected_files: HashSet<String>,
}

#[derive(Debug, Default)]
struct Inner {
    connected: bool,
    queues: HashMap<String, VecDeque<WorkItem>>,
    session_sinks: Vec<EventSink>,
    queue_sinks: HashMap<String, Vec<EventSink>>,
    updates: Vec<UpdateRecord>,
    update_attempts: usize,
    next_item: u64,
    next_file: u64,
    next_subscription: u64,
    faults: Faults,
}

#[derive(Debug)]
pub struct MemoryQueue {
    inner: Mutex<Inner>,
    max_retries: u32,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Seed a queue from a JSON array of workitems. Items without a `wiq`
    /// go to `default_wiq`.
    pub fn from_json_file(path: &Path, default_wiq: &str) -> Result<Self, WorkerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let items: Vec<WorkItem> = serde_json::from_str(&contents)?;
        let queue = Self::new();
        for item in items {
            let wiq = if item.wiq.is_empty() {
                default_wiq.to_string()
            } else {
                item.wiq.clone()
            };
            queue.push(&wiq, item);
        }
        Ok(queue)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue `item` on `wiq` and notify the consumers registered for it.
    pub fn push(&self, wiq: &str, mut item: WorkItem) -> WorkItemId {
        let (id, sinks) = {
            let mut inner = self.lock();
            if item.id.is_empty() {
                inner.next_item += 1;
                item.id = WorkItemId(format!("wi-{}", inner.next_item));
            }
            item.wiq = wiq.to_string();
            let id = item.id.clone();
            inner.queues.entry(wiq.to_string()).or_default().push_back(item);
            let sinks = inner.queue_sinks.get(wiq).cloned().unwrap_or_default();
            (id, sinks)
        };
        for sink in sinks {
            sink.queue_available(wiq);
        }
        id
    }

    pub fn pending(&self, wiq: &str) -> usize {
        self.lock().queues.get(wiq).map(VecDeque::len).unwrap_or(0)
    }

    /// Accepted updates in arrival order.
    pub fn updates(&self) -> Vec<UpdateRecord> {
        self.lock().updates.clone()
    }

    /// Every update call, accepted or not.
    pub fn update_attempts(&self) -> usize {
        self.lock().update_attempts
    }

    pub fn fail_connect(&self) {
        self.lock().faults.connect = true;
    }

    pub fn fail_subscribe(&self) {
        self.lock().faults.subscribe = true;
    }

    /// Refuse the next queue registration.
    pub fn fail_register_once(&self) {
        self.lock().faults.register_failures += 1;
    }

    pub fn fail_pop(&self, fail: bool) {
        self.lock().faults.pop = fail;
    }

    pub fn fail_update_for(&self, id: impl Into<WorkItemId>) {
        self.lock().faults.update_for.insert(id.into());
    }

    /// Never store an attachment with this file name.
    pub fn reject_attachment(&self, filename: &str) {
        self.lock().faults.rejected_files.insert(filename.to_string());
    }

    /// Drop and re-establish the session, emitting `Disconnected` then `SignedIn`.
    pub fn simulate_reconnect(&self) {
        let sinks = {
            let mut inner = self.lock();
            inner.queue_sinks.clear();
            inner.session_sinks.clone()
        };
        for sink in sinks {
            emit(sink, &[DISCONNECTED, SIGNED_IN]);
        }
    }
}

/// Deliver session events from a thread of our own, like a remote client would.
fn emit(sink: EventSink, names: &'static [&'static str]) {
    let spawned = thread::Builder::new()
        .name("memory-queue-events".to_string())
        .spawn(move || {
            for name in names {
                sink.session_event(name);
            }
        });
    if let Err(err) = spawned {
        tracing::error!(error = %err, "failed to spawn event thread");
    }
}

#[async_trait]
impl QueueClient for MemoryQueue {
    async fn connect(&self) -> Result<(), ConnectError> {
        let sinks = {
            let mut inner = self.lock();
            if inner.faults.connect {
                return Err(ConnectError::Unavailable("connection refused".to_string()));
            }
            inner.connected = true;
            inner.session_sinks.clone()
        };
        for sink in sinks {
            emit(sink, &[SIGNED_IN]);
        }
        Ok(())
    }

    async fn on_session_event(&self, sink: EventSink) -> Result<String, ConnectError> {
        let (id, connected) = {
            let mut inner = self.lock();
            if inner.faults.subscribe {
                return Err(ConnectError::Rejected("event subscription refused".to_string()));
            }
            inner.next_subscription += 1;
            inner.session_sinks.push(sink.clone());
            (format!("evt-{}", inner.next_subscription), inner.connected)
        };
        if connected {
            emit(sink, &[SIGNED_IN]);
        }
        Ok(id)
    }

    async fn register_queue(
        &self,
        queuename: &str,
        sink: EventSink,
    ) -> Result<RegisteredQueue, RegisterError> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(RegisterError::Unavailable("not connected".to_string()));
        }
        if inner.faults.register_failures > 0 {
            inner.faults.register_failures -= 1;
            return Err(RegisterError::Rejected {
                queue: queuename.to_string(),
                reason: "registration refused".to_string(),
            });
        }

        let sinks = inner.queue_sinks.entry(queuename.to_string()).or_default();
        if !sinks.iter().any(|existing| existing.same_target(&sink)) {
            sinks.push(sink);
        }
        Ok(RegisteredQueue {
            queuename: queuename.to_string(),
        })
    }

    async fn pop_workitem(&self, request: &PopRequest) -> Result<Option<WorkItem>, PopError> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(PopError::Unavailable("not connected".to_string()));
        }
        if inner.faults.pop {
            return Err(PopError::Rejected {
                wiq: request.wiq.clone(),
                reason: "pop refused".to_string(),
            });
        }
        Ok(inner
            .queues
            .get_mut(&request.wiq)
            .and_then(VecDeque::pop_front))
    }

    async fn update_workitem(&self, request: UpdateRequest) -> Result<UpdateResponse, UpdateError> {
        let mut inner = self.lock();
        inner.update_attempts += 1;
        if inner.faults.update_for.contains(&request.item.id) {
            return Err(UpdateError::Rejected {
                id: request.item.id.clone(),
                reason: "update refused".to_string(),
            });
        }

        let mut files = Vec::with_capacity(request.files.len());
        for mut file in request.files {
            let stored = !inner.faults.rejected_files.contains(&file.filename)
                && request.workdir.join(&file.filename).is_file();
            if stored {
                inner.next_file += 1;
                file.remote_id = Some(format!("file-{}", inner.next_file));
            }
            files.push(file);
        }

        let item = request.item;
        if item.state() == WorkItemState::Retry
            && item.retries < self.max_retries
            && !item.wiq.is_empty()
        {
            let again = item.redeliver();
            inner.queues.entry(item.wiq.clone()).or_default().push_back(again);
        }

        inner.updates.push(UpdateRecord {
            item: item.clone(),
            files: files.clone(),
        });
        Ok(UpdateResponse { item, files })
    }

    async fn disconnect(&self) {
        self.lock().connected = false;
    }
}
