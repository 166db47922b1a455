//! Internal classifications and lifecycle states.
//!
//! Mirrors the role of `shipcat_definitions::states::ConfigType`: small,
//! exhaustively-matched enums that the rest of the crate builds on instead
//! of stringly-typed status fields.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClusterStatus {
    Active,
    Provisioning,
    Deprovisioning,
    Failed,
    Inactive,
}

impl ClusterStatus {
    pub fn as_aws_str(&self) -> &'static str {
        match self {
            ClusterStatus::Active => "ACTIVE",
            ClusterStatus::Provisioning => "PROVISIONING",
            ClusterStatus::Deprovisioning => "DEPROVISIONING",
            ClusterStatus::Failed => "FAILED",
            ClusterStatus::Inactive => "INACTIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceStatus {
    Provisioning,
    Active,
    Draining,
    Inactive,
    Failed,
    Pending,
}

impl ServiceStatus {
    pub fn as_aws_str(&self) -> &'static str {
        match self {
            ServiceStatus::Provisioning => "PROVISIONING",
            ServiceStatus::Active => "ACTIVE",
            ServiceStatus::Draining => "DRAINING",
            ServiceStatus::Inactive => "INACTIVE",
            ServiceStatus::Failed => "FAILED",
            ServiceStatus::Pending => "PENDING",
        }
    }

    /// Statuses that count towards `Cluster::active_services_count`.
    pub fn counts_as_active(&self) -> bool {
        matches!(
            self,
            ServiceStatus::Active
                | ServiceStatus::Draining
                | ServiceStatus::Pending
                | ServiceStatus::Provisioning
        )
    }
}

/// Task lifecycle state machine.
///
/// `PROVISIONING -> PENDING -> ACTIVATING -> RUNNING -> DEACTIVATING ->
/// STOPPING -> DEPROVISIONING -> STOPPED`. Transitions are monotonic:
/// once `Stopped`, the state never changes, and a requested transition to
/// an earlier state in the sequence is ignored rather than erroring (the
/// caller's desired-state request may simply be stale).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaskLifecycle {
    Provisioning,
    Pending,
    Activating,
    Running,
    Deactivating,
    Stopping,
    Deprovisioning,
    Stopped,
}

impl TaskLifecycle {
    pub fn as_aws_str(&self) -> &'static str {
        match self {
            TaskLifecycle::Provisioning => "PROVISIONING",
            TaskLifecycle::Pending => "PENDING",
            TaskLifecycle::Activating => "ACTIVATING",
            TaskLifecycle::Running => "RUNNING",
            TaskLifecycle::Deactivating => "DEACTIVATING",
            TaskLifecycle::Stopping => "STOPPING",
            TaskLifecycle::Deprovisioning => "DEPROVISIONING",
            TaskLifecycle::Stopped => "STOPPED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskLifecycle::Stopped)
    }

    /// Apply a requested transition, ignoring illegal back-transitions and
    /// any attempt to move a terminal task.
    pub fn advance(self, requested: TaskLifecycle) -> TaskLifecycle {
        if self.is_terminal() {
            return self;
        }
        if requested > self {
            requested
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_is_sticky() {
        let s = TaskLifecycle::Stopped;
        assert_eq!(s.advance(TaskLifecycle::Running), TaskLifecycle::Stopped);
    }

    #[test]
    fn ignores_back_transitions() {
        let s = TaskLifecycle::Running;
        assert_eq!(s.advance(TaskLifecycle::Pending), TaskLifecycle::Running);
    }

    #[test]
    fn advances_forward() {
        let s = TaskLifecycle::Pending;
        assert_eq!(s.advance(TaskLifecycle::Running), TaskLifecycle::Running);
    }
}
