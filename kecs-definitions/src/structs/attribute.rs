use serde::{Deserialize, Serialize};

/// A free-form key/optional-value attached to a cluster or a target within
/// it (container instance, task). ECS's `PutAttributes`/`DeleteAttributes`/
/// `ListAttributes` surface; we keep it as its own small table rather than
/// folding it into `Cluster` since attributes are queried by target type
/// independently of the owning resource's row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_id: Option<String>,
}
