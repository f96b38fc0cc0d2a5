//! Connection and registration state owned by one controller.

use std::fmt;

use wiq_core::{WorkItemId, WorkerConfig};

use crate::client::RegisteredQueue;

/// Lifecycle states of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ControllerState {
    #[default]
    Disconnected,
    Connecting,
    SignedIn,
    QueueRegistered,
    Polling,
    Draining(WorkItemId),
}

impl fmt::Display for ControllerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerState::Disconnected => write!(f, "disconnected"),
            ControllerState::Connecting => write!(f, "connecting"),
            ControllerState::SignedIn => write!(f, "signed-in"),
            ControllerState::QueueRegistered => write!(f, "queue-registered"),
            ControllerState::Polling => write!(f, "polling"),
            ControllerState::Draining(id) => write!(f, "draining({id})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: ControllerState,
    wiq: String,
    queue: String,
    subscription: Option<String>,
    registered: Option<RegisteredQueue>,
    items_drained: u64,
}

impl Session {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            state: ControllerState::Disconnected,
            wiq: config.wiq.clone(),
            queue: config.queue.clone(),
            subscription: None,
            registered: None,
            items_drained: 0,
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn wiq(&self) -> &str {
        &self.wiq
    }

    /// Name the worker registers for availability notifications.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn subscription(&self) -> Option<&str> {
        self.subscription.as_deref()
    }

    pub fn registered(&self) -> Option<&RegisteredQueue> {
        self.registered.as_ref()
    }

    pub fn is_registered(&self) -> bool {
        self.registered.is_some()
    }

    /// Items processed over the session's lifetime.
    pub fn items_drained(&self) -> u64 {
        self.items_drained
    }

    pub(crate) fn transition(&mut self, next: ControllerState) {
        if self.state != next {
            tracing::debug!(from = %self.state, to = %next, "controller state transition");
            self.state = next;
        }
    }

    pub(crate) fn set_subscription(&mut self, id: String) {
        self.subscription = Some(id);
    }

    pub(crate) fn on_registered(&mut self, registered: RegisteredQueue) {
        self.registered = Some(registered);
        self.transition(ControllerState::QueueRegistered);
    }

    /// Forget the registration; a later sign-in registers again.
    pub(crate) fn on_disconnected(&mut self) {
        self.registered = None;
        self.transition(ControllerState::Disconnected);
    }

    pub(crate) fn record_item(&mut self) {
        self.items_drained += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_takes_names_from_config() {
        let config = WorkerConfig::default().with_wiq("orders").with_queue("orders-ready");
        let session = Session::new(&config);
        assert_eq!(session.state(), &ControllerState::Disconnected);
        assert_eq!(session.wiq(), "orders");
        assert_eq!(session.queue(), "orders-ready");
        assert!(!session.is_registered());
    }

    #[test]
    fn disconnect_forgets_registration() {
        let mut session = Session::new(&WorkerConfig::default());
        session.transition(ControllerState::SignedIn);
        session.on_registered(RegisteredQueue {
            queuename: "cqueue".to_string(),
        });
        assert_eq!(session.state(), &ControllerState::QueueRegistered);

        session.on_disconnected();
        assert_eq!(session.state(), &ControllerState::Disconnected);
        assert!(session.registered().is_none());
    }

    #[test]
    fn draining_state_displays_item_id() {
        let state = ControllerState::Draining(WorkItemId::from("wi-3"));
        assert_eq!(state.to_string(), "draining(wi-3)");
    }
}
