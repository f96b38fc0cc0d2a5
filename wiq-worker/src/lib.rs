//! Workitem worker: queue client seam, executor, reconciler and the
//! lifecycle controller that drains a queue one item at a time.

pub mod client;
pub mod controller;
mod error;
pub mod event;
pub mod executor;
pub mod memory;
pub mod reconciler;
mod runtime;
pub mod session;

pub use client::{PopRequest, QueueClient, RegisteredQueue, UpdateRequest, UpdateResponse};
pub use controller::{Controller, DrainSummary, RunMode, Shutdown, WorkerReport};
pub use error::{ConnectError, PopError, RegisterError, UpdateError, WorkerError};
pub use event::{event_channel, EventInbox, EventSink, SessionEvent, WorkerEvent};
pub use executor::{from_fn, Executor, FnExecutor, HelloExecutor};
pub use memory::{MemoryQueue, UpdateRecord};
pub use reconciler::{reconcile, ReconcileResult, ReconcileStatus};
pub use runtime::{init_tracing, run, start_blocking, LogFormat};
pub use session::{ControllerState, Session};
