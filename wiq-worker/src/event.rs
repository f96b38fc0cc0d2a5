//! Events pushed by the queue service collaborator into the controller loop.
//!
//! Collaborators deliver events from threads they own. [`EventSink`] never
//! blocks or awaits: queue notifications use `try_send` on a bounded channel
//! and session events an unbounded one.

use std::fmt;

use tokio::sync::mpsc::{self, error::TrySendError};

pub const SIGNED_IN: &str = "SignedIn";
pub const DISCONNECTED: &str = "Disconnected";

/// Session-level event reported by the queue service client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Disconnected,
    Other(String),
}

impl SessionEvent {
    pub fn from_name(name: &str) -> Self {
        match name {
            SIGNED_IN => SessionEvent::SignedIn,
            DISCONNECTED => SessionEvent::Disconnected,
            other => SessionEvent::Other(other.to_string()),
        }
    }
}

impl fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionEvent::SignedIn => write!(f, "{SIGNED_IN}"),
            SessionEvent::Disconnected => write!(f, "{DISCONNECTED}"),
            SessionEvent::Other(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Session(SessionEvent),
    /// The named queue has work available.
    QueueAvailable { queue: String },
}

/// Create a connected sink/inbox pair.
///
/// Queue notifications share a bounded channel of `capacity` slots and are
/// dropped when it is full; a pending drain already covers them. Session
/// events travel on their own unbounded channel and are never dropped.
pub fn event_channel(capacity: usize) -> (EventSink, EventInbox) {
    let (queue_tx, queue_rx) = mpsc::channel(capacity.max(1));
    let (session_tx, session_rx) = mpsc::unbounded_channel();
    (
        EventSink {
            queue_tx,
            session_tx,
        },
        EventInbox {
            queue_rx,
            session_rx,
        },
    )
}

/// Cloneable callback handle given to the queue service client.
#[derive(Debug, Clone)]
pub struct EventSink {
    queue_tx: mpsc::Sender<WorkerEvent>,
    session_tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    /// Forward a session event by name, e.g. `"SignedIn"`.
    pub fn session_event(&self, name: &str) {
        let event = SessionEvent::from_name(name);
        if self.session_tx.send(event).is_err() {
            tracing::debug!("worker event channel closed");
        }
    }

    /// Signal that `queue` has work.
    pub fn queue_available(&self, queue: &str) {
        let event = WorkerEvent::QueueAvailable {
            queue: queue.to_string(),
        };
        match self.queue_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::warn!(event = ?event, "worker event channel full, dropping notification");
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!("worker event channel closed");
            }
        }
    }

    /// `true` when both sinks feed the same controller.
    pub fn same_target(&self, other: &EventSink) -> bool {
        self.queue_tx.same_channel(&other.queue_tx)
    }
}

/// Receiving side of [`event_channel`], owned by the controller.
#[derive(Debug)]
pub struct EventInbox {
    queue_rx: mpsc::Receiver<WorkerEvent>,
    session_rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl EventInbox {
    /// Next event, session events first. Returns `None` once every sink is gone.
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        tokio::select! {
            biased;
            Some(event) = self.session_rx.recv() => Some(WorkerEvent::Session(event)),
            Some(event) = self.queue_rx.recv() => Some(event),
            else => None,
        }
    }

    /// Non-blocking variant of [`EventInbox::recv`].
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        match self.session_rx.try_recv() {
            Ok(event) => Some(WorkerEvent::Session(event)),
            Err(_) => self.queue_rx.try_recv().ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn available(queue: &str) -> WorkerEvent {
        WorkerEvent::QueueAvailable {
            queue: queue.to_string(),
        }
    }

    #[test]
    fn parses_known_session_events() {
        assert_eq!(SessionEvent::from_name("SignedIn"), SessionEvent::SignedIn);
        assert_eq!(SessionEvent::from_name("Disconnected"), SessionEvent::Disconnected);
        assert_eq!(
            SessionEvent::from_name("Reconnecting"),
            SessionEvent::Other("Reconnecting".to_string())
        );
    }

    #[test]
    fn full_channel_drops_notifications_without_blocking() {
        let (sink, mut inbox) = event_channel(1);
        sink.queue_available("cqueue");
        sink.queue_available("cqueue");

        assert_eq!(inbox.try_recv(), Some(available("cqueue")));
        assert_eq!(inbox.try_recv(), None, "second notification should have been dropped");
    }

    #[test]
    fn session_events_survive_a_full_channel() {
        let (sink, mut inbox) = event_channel(1);
        sink.queue_available("cqueue");
        sink.queue_available("cqueue");
        sink.session_event("Disconnected");
        sink.session_event("SignedIn");

        assert_eq!(inbox.try_recv(), Some(WorkerEvent::Session(SessionEvent::Disconnected)));
        assert_eq!(inbox.try_recv(), Some(WorkerEvent::Session(SessionEvent::SignedIn)));
        assert_eq!(inbox.try_recv(), Some(available("cqueue")));
        assert_eq!(inbox.try_recv(), None);
    }

    #[tokio::test]
    async fn recv_prefers_session_events() {
        let (sink, mut inbox) = event_channel(4);
        sink.queue_available("cqueue");
        sink.session_event("SignedIn");

        assert_eq!(inbox.recv().await, Some(WorkerEvent::Session(SessionEvent::SignedIn)));
        assert_eq!(inbox.recv().await, Some(available("cqueue")));
    }

    #[tokio::test]
    async fn recv_ends_when_every_sink_is_dropped() {
        let (sink, mut inbox) = event_channel(1);
        drop(sink);
        assert_eq!(inbox.recv().await, None);
    }

    #[test]
    fn delivery_from_foreign_thread() {
        let (sink, mut inbox) = event_channel(4);
        std::thread::spawn(move || sink.session_event("SignedIn"))
            .join()
            .expect("join");
        assert_eq!(inbox.try_recv(), Some(WorkerEvent::Session(SessionEvent::SignedIn)));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (sink, inbox) = event_channel(1);
        drop(inbox);
        sink.session_event("SignedIn");
        sink.queue_available("cqueue");
    }

    #[test]
    fn clones_share_a_target() {
        let (sink, _inbox) = event_channel(1);
        let (other, _other_inbox) = event_channel(1);
        assert!(sink.same_target(&sink.clone()));
        assert!(!sink.same_target(&other));
    }
}
