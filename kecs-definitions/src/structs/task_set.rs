use crate::arn::Arn;
use serde::{Deserialize, Serialize};

/// A deployment slice within a service, enabling blue/green and canary
/// rollouts (spec GLOSSARY). At most one `TaskSet` per service may be
/// primary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSet {
    pub id: String,
    pub arn: Arn,
    pub service_arn: Arn,
    pub cluster_arn: Arn,
    pub status: TaskSetStatus,
    #[serde(default)]
    pub stability_status: StabilityStatus,
    #[serde(default)]
    pub computed_desired_count: u32,
    #[serde(default)]
    pub running_count: u32,
    #[serde(default)]
    pub pending_count: u32,
    #[serde(default)]
    pub scale: Scale,
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub launch_type: Option<String>,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskSetStatus {
    Primary,
    Active,
    Draining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityStatus {
    Steady,
    Stabilizing,
}

impl Default for StabilityStatus {
    fn default() -> Self {
        StabilityStatus::Stabilizing
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Scale {
    #[serde(default = "default_scale_value")]
    pub value: f64,
    #[serde(default = "default_scale_unit")]
    pub unit: ScaleUnit,
}

fn default_scale_value() -> f64 {
    100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleUnit {
    Percent,
}

fn default_scale_unit() -> ScaleUnit {
    ScaleUnit::Percent
}

impl Default for Scale {
    fn default() -> Self {
        Scale {
            value: default_scale_value(),
            unit: default_scale_unit(),
        }
    }
}
