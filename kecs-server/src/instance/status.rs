//! The instance creation-status map (spec 4.5, 9: "Global mutable state").
//!
//! A process-wide map guarded by a reader-writer lock, with a clear
//! lifecycle: one entry per instance currently starting, removed once the
//! instance reaches a terminal state (ready or failed). Kept as a field on
//! `AppState` rather than a `static` so it is constructible per-test.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    Pending,
    Running,
    Done,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub name: String,
    pub state: StepState,
    pub message: Option<String>,
}

impl Step {
    pub fn pending(name: &str) -> Self {
        Step {
            name: name.to_string(),
            state: StepState::Pending,
            message: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub name: String,
    pub steps: Vec<Step>,
    pub ready: bool,
    pub failed: bool,
}

impl InstanceStatus {
    pub fn new(name: &str, step_names: &[&str]) -> Self {
        InstanceStatus {
            name: name.to_string(),
            steps: step_names.iter().map(|s| Step::pending(s)).collect(),
            ready: false,
            failed: false,
        }
    }

    pub fn set_step(&mut self, name: &str, state: StepState, message: Option<String>) {
        if let Some(step) = self.steps.iter_mut().find(|s| s.name == name) {
            step.state = state;
            step.message = message;
        }
    }
}

#[derive(Default)]
pub struct InstanceStatusMap {
    inner: RwLock<HashMap<String, InstanceStatus>>,
}

impl InstanceStatusMap {
    pub fn new() -> Self {
        InstanceStatusMap::default()
    }

    pub fn start(&self, status: InstanceStatus) {
        self.inner.write().unwrap().insert(status.name.clone(), status);
    }

    pub fn update<F: FnOnce(&mut InstanceStatus)>(&self, name: &str, f: F) {
        if let Some(status) = self.inner.write().unwrap().get_mut(name) {
            f(status);
        }
    }

    pub fn get(&self, name: &str) -> Option<InstanceStatus> {
        self.inner.read().unwrap().get(name).cloned()
    }

    /// Removes the entry once the instance reaches a terminal state.
    pub fn remove(&self, name: &str) {
        self.inner.write().unwrap().remove(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_lifecycle_start_update_remove() {
        let map = InstanceStatusMap::new();
        map.start(InstanceStatus::new("dev", &["cluster", "namespace"]));
        map.update("dev", |s| s.set_step("cluster", StepState::Done, None));
        let status = map.get("dev").unwrap();
        assert_eq!(status.steps[0].state, StepState::Done);
        map.remove("dev");
        assert!(map.get("dev").is_none());
    }
}
