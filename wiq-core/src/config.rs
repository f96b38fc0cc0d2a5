//! Worker configuration, read from the process environment.

use std::path::PathBuf;

/// Workitem queue used when `wiq` is unset.
pub const DEFAULT_WIQ: &str = "cqueue";
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

pub const ENV_WIQ: &str = "wiq";
pub const ENV_QUEUE: &str = "queue";
pub const ENV_WORKDIR: &str = "WIQ_WORKDIR";
pub const ENV_EVENT_CAPACITY: &str = "WIQ_EVENT_CAPACITY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Workitem queue to pop from.
    pub wiq: String,
    /// Queue name to register for availability notifications.
    pub queue: String,
    /// Directory the executor works in and artifacts are collected from.
    pub workdir: PathBuf,
    /// Bound of the event channel between collaborator threads and the controller.
    pub event_capacity: usize,
    queue_follows_wiq: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            wiq: DEFAULT_WIQ.to_string(),
            queue: DEFAULT_WIQ.to_string(),
            workdir: PathBuf::from("."),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            queue_follows_wiq: true,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let wiq = get(ENV_WIQ).unwrap_or_else(|| DEFAULT_WIQ.to_string());
        let queue = get(ENV_QUEUE);
        let queue_follows_wiq = queue.is_none();
        let event_capacity = get(ENV_EVENT_CAPACITY)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_EVENT_CAPACITY);

        Self {
            queue: queue.unwrap_or_else(|| wiq.clone()),
            wiq,
            workdir: get(ENV_WORKDIR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
            event_capacity,
            queue_follows_wiq,
        }
    }

    /// Override the workitem queue; a defaulted `queue` keeps following it.
    pub fn with_wiq(mut self, wiq: impl Into<String>) -> Self {
        self.wiq = wiq.into();
        if self.queue_follows_wiq {
            self.queue = self.wiq.clone();
        }
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self.queue_follows_wiq = false;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = WorkerConfig::from_lookup(lookup(&[]));
        assert_eq!(config.wiq, "cqueue");
        assert_eq!(config.queue, "cqueue");
        assert_eq!(config.workdir, PathBuf::from("."));
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }

    #[test]
    fn queue_defaults_to_wiq() {
        let config = WorkerConfig::from_lookup(lookup(&[("wiq", "invoices")]));
        assert_eq!(config.wiq, "invoices");
        assert_eq!(config.queue, "invoices");
    }

    #[test]
    fn explicit_queue_is_kept_when_wiq_overridden() {
        let config = WorkerConfig::from_lookup(lookup(&[("queue", "notify")])).with_wiq("orders");
        assert_eq!(config.wiq, "orders");
        assert_eq!(config.queue, "notify");
    }

    #[test]
    fn defaulted_queue_follows_wiq_override() {
        let config = WorkerConfig::from_lookup(lookup(&[])).with_wiq("orders");
        assert_eq!(config.queue, "orders");
    }
}
