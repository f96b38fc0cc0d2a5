//! Domain types for workitems handled by the worker.
//!
//! A [`WorkItem`] is handed out by the queue service, executed once, resolved
//! through [`WorkItem::resolve`] and handed back. State and error fields are
//! private so that resolution is the only way to change them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier assigned to a workitem by the queue service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkItemId(pub String);

impl WorkItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WorkItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for WorkItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for WorkItemId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle state of a workitem as reported back to the queue service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemState {
    #[default]
    Pending,
    Successful,
    Retry,
    Fatal,
}

impl WorkItemState {
    /// `true` once an execution attempt has been resolved.
    pub fn is_terminal(self) -> bool {
        !matches!(self, WorkItemState::Pending)
    }
}

impl fmt::Display for WorkItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkItemState::Pending => write!(f, "pending"),
            WorkItemState::Successful => write!(f, "successful"),
            WorkItemState::Retry => write!(f, "retry"),
            WorkItemState::Fatal => write!(f, "fatal"),
        }
    }
}

/// Error details carried by a failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub errortype: String,
    pub errormessage: String,
    pub errorsource: String,
}

impl ItemFailure {
    pub fn new(
        errortype: impl Into<String>,
        errormessage: impl Into<String>,
        errorsource: impl Into<String>,
    ) -> Self {
        Self {
            errortype: errortype.into(),
            errormessage: errormessage.into(),
            errorsource: errorsource.into(),
        }
    }
}

/// Result of running the business logic for one workitem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Success,
    /// The queue service may hand the item out again.
    Retry(ItemFailure),
    /// The item must not be retried.
    Fatal(ItemFailure),
}

impl ExecutionOutcome {
    pub fn retry(
        errortype: impl Into<String>,
        errormessage: impl Into<String>,
        errorsource: impl Into<String>,
    ) -> Self {
        Self::Retry(ItemFailure::new(errortype, errormessage, errorsource))
    }

    pub fn fatal(
        errortype: impl Into<String>,
        errormessage: impl Into<String>,
        errorsource: impl Into<String>,
    ) -> Self {
        Self::Fatal(ItemFailure::new(errortype, errormessage, errorsource))
    }

    /// The workitem state this outcome resolves to.
    pub fn state(&self) -> WorkItemState {
        match self {
            ExecutionOutcome::Success => WorkItemState::Successful,
            ExecutionOutcome::Retry(_) => WorkItemState::Retry,
            ExecutionOutcome::Fatal(_) => WorkItemState::Fatal,
        }
    }

    pub fn failure(&self) -> Option<&ItemFailure> {
        match self {
            ExecutionOutcome::Success => None,
            ExecutionOutcome::Retry(failure) | ExecutionOutcome::Fatal(failure) => Some(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One unit of queued work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(default)]
    pub id: WorkItemId,
    #[serde(default)]
    pub name: String,
    /// Workitem queue the item was popped from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wiq: String,
    #[serde(default)]
    pub payload: Value,
    /// Prior attempts; read-only to the worker.
    #[serde(default)]
    pub retries: u32,
    /// Input files delivered alongside the item.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default)]
    state: WorkItemState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errortype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errormessage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    errorsource: Option<String>,
}

impl WorkItem {
    pub fn new(id: impl Into<WorkItemId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            wiq: String::new(),
            payload: Value::Null,
            retries: 0,
            files: Vec::new(),
            state: WorkItemState::Pending,
            errortype: None,
            errormessage: None,
            errorsource: None,
        }
    }

    pub fn with_wiq(mut self, wiq: impl Into<String>) -> Self {
        self.wiq = wiq.into();
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn state(&self) -> WorkItemState {
        self.state
    }

    pub fn errortype(&self) -> Option<&str> {
        self.errortype.as_deref()
    }

    pub fn errormessage(&self) -> Option<&str> {
        self.errormessage.as_deref()
    }

    pub fn errorsource(&self) -> Option<&str> {
        self.errorsource.as_deref()
    }

    /// Error details, present only for `retry` and `fatal` items.
    pub fn failure(&self) -> Option<ItemFailure> {
        if !matches!(self.state, WorkItemState::Retry | WorkItemState::Fatal) {
            return None;
        }
        Some(ItemFailure {
            errortype: self.errortype.clone().unwrap_or_default(),
            errormessage: self.errormessage.clone().unwrap_or_default(),
            errorsource: self.errorsource.clone().unwrap_or_default(),
        })
    }

    /// Apply an execution outcome, consuming the popped item.
    ///
    /// This is the only mutator for `state` and the error fields. A successful
    /// outcome clears any error fields left over from a previous attempt.
    pub fn resolve(mut self, outcome: &ExecutionOutcome) -> Self {
        self.state = outcome.state();
        match outcome.failure() {
            Some(failure) => {
                self.errortype = Some(failure.errortype.clone());
                self.errormessage = Some(failure.errormessage.clone());
                self.errorsource = Some(failure.errorsource.clone());
            }
            None => {
                self.errortype = None;
                self.errormessage = None;
                self.errorsource = None;
            }
        }
        self
    }

    /// A fresh pending copy for another delivery attempt.
    pub fn redeliver(&self) -> Self {
        Self {
            retries: self.retries.saturating_add(1),
            state: WorkItemState::Pending,
            errortype: None,
            errormessage: None,
            errorsource: None,
            ..self.clone()
        }
    }
}

/// A file discovered in the working directory after an item ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactDescriptor {
    /// Path relative to the working directory.
    pub filename: String,
    /// Assigned by the queue service once uploaded.
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    #[serde(default)]
    pub compressed: bool,
}

impl ArtifactDescriptor {
    /// Descriptor under the default upload policy: uncompressed, not yet uploaded.
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            remote_id: None,
            compressed: false,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.remote_id.is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newtype_display() {
        assert_eq!(WorkItemId::from("wi-01").to_string(), "wi-01");
        assert_eq!(WorkItemState::Successful.to_string(), "successful");
    }

    #[test]
    fn popped_item_starts_pending_without_errors() {
        let item = WorkItem::new("wi-1", "invoice");
        assert_eq!(item.state(), WorkItemState::Pending);
        assert!(item.failure().is_none());
        assert!(!item.state().is_terminal());
    }

    #[test]
    fn resolve_success_clears_previous_errors() {
        let failed = WorkItem::new("wi-1", "invoice")
            .resolve(&ExecutionOutcome::retry("application", "boom", "test"));
        assert_eq!(failed.errortype(), Some("application"));

        let retried = failed.redeliver().resolve(&ExecutionOutcome::Success);
        assert_eq!(retried.state(), WorkItemState::Successful);
        assert_eq!(retried.errortype(), None);
        assert_eq!(retried.errormessage(), None);
        assert_eq!(retried.errorsource(), None);
    }

    #[test]
    fn redeliver_bumps_retries_and_resets_state() {
        let item = WorkItem::new("wi-1", "invoice")
            .with_retries(2)
            .resolve(&ExecutionOutcome::retry("application", "later", "test"));
        let again = item.redeliver();
        assert_eq!(again.retries, 3);
        assert_eq!(again.state(), WorkItemState::Pending);
        assert!(again.failure().is_none());
        assert_eq!(again.id, item.id);
    }

    #[test]
    fn state_serializes_lowercase() {
        let item = WorkItem::new("wi-1", "invoice")
            .resolve(&ExecutionOutcome::fatal("application", "boom", "test"));
        let json = serde_json::to_value(&item).expect("serialize");
        assert_eq!(json["state"], "fatal");
        assert_eq!(json["errortype"], "application");
    }

    #[test]
    fn default_descriptor_is_uncompressed_and_unattached() {
        let descriptor = ArtifactDescriptor::new("hello.txt");
        assert!(!descriptor.compressed);
        assert!(!descriptor.is_attached());
        let json = serde_json::to_value(&descriptor).expect("serialize");
        assert!(json.get("id").is_none());
    }
}
