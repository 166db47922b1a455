//! Sub-structs shared by more than one top-level entity.

use serde::{Deserialize, Serialize};

/// A single ECS tag.
///
/// ECS represents tags as a list of key/value pairs on the wire (not a
/// map), even though internally we fold them into a `BTreeMap` wherever we
/// need map-like lookups (label/annotation sanitization, see
/// `kecs_server::converters::labels`).
///
/// ```json
/// {"key": "team", "value": "payments"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Environment variable / secret name-value pair, as ECS represents both
/// plain environment entries and `dependsOn` conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// awsvpc-style network configuration for a `Service`/`RunTask` call.
///
/// ```json
/// {
///   "awsvpcConfiguration": {
///     "subnets": ["subnet-abc"],
///     "securityGroups": ["sg-abc"],
///     "assignPublicIp": "DISABLED"
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub awsvpc_configuration: Option<AwsVpcConfiguration>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsVpcConfiguration {
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub assign_public_ip: Option<String>,
}
