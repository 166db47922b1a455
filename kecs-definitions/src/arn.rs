//! ARN construction and parsing.
//!
//! `arn:aws:<service>:<region>:<account>:<resource-type>/<name>` — see
//! spec GLOSSARY. Round-tripping (parse then format back to the original
//! string) is a testable property.

use crate::error::ApiError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Arn {
    pub service: String,
    pub region: String,
    pub account: String,
    pub resource_type: String,
    pub resource_id: String,
}

impl Arn {
    pub fn new(
        service: impl Into<String>,
        region: impl Into<String>,
        account: impl Into<String>,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        Arn {
            service: service.into(),
            region: region.into(),
            account: account.into(),
            resource_type: resource_type.into(),
            resource_id: resource_id.into(),
        }
    }

    pub fn cluster(region: &str, account: &str, name: &str) -> Self {
        Arn::new("ecs", region, account, "cluster", name)
    }

    pub fn task_definition(region: &str, account: &str, family: &str, revision: u32) -> Self {
        Arn::new(
            "ecs",
            region,
            account,
            "task-definition",
            format!("{family}:{revision}"),
        )
    }

    pub fn service(region: &str, account: &str, cluster: &str, name: &str) -> Self {
        Arn::new(
            "ecs",
            region,
            account,
            "service",
            format!("{cluster}/{name}"),
        )
    }

    pub fn task(region: &str, account: &str, cluster: &str, id: &str) -> Self {
        Arn::new("ecs", region, account, "task", format!("{cluster}/{id}"))
    }

    pub fn task_set(region: &str, account: &str, cluster: &str, service: &str, id: &str) -> Self {
        Arn::new(
            "ecs",
            region,
            account,
            "task-set",
            format!("{cluster}/{service}/{id}"),
        )
    }
}

impl fmt::Display for Arn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:aws:{}:{}:{}:{}/{}",
            self.service, self.region, self.account, self.resource_type, self.resource_id
        )
    }
}

impl FromStr for Arn {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix("arn:aws:")
            .ok_or_else(|| ApiError::InvalidParameter(format!("not an ARN: {s}")))?;
        let mut parts = rest.splitn(4, ':');
        let service = parts
            .next()
            .ok_or_else(|| ApiError::InvalidParameter(format!("malformed ARN: {s}")))?;
        let region = parts.next().unwrap_or_default();
        let account = parts.next().unwrap_or_default();
        let resource = parts
            .next()
            .ok_or_else(|| ApiError::InvalidParameter(format!("malformed ARN: {s}")))?;
        let (resource_type, resource_id) = resource
            .split_once('/')
            .ok_or_else(|| ApiError::InvalidParameter(format!("malformed ARN resource: {s}")))?;
        Ok(Arn {
            service: service.to_string(),
            region: region.to_string(),
            account: account.to_string(),
            resource_type: resource_type.to_string(),
            resource_id: resource_id.to_string(),
        })
    }
}

impl serde::Serialize for Arn {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Arn {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_cluster_arn() {
        let original = "arn:aws:ecs:us-east-1:000000000000:cluster/prod";
        let parsed: Arn = original.parse().unwrap();
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn round_trips_task_definition_arn() {
        let original = "arn:aws:ecs:eu-west-2:123456789012:task-definition/web:7";
        let parsed: Arn = original.parse().unwrap();
        assert_eq!(parsed.resource_id, "web:7");
        assert_eq!(parsed.to_string(), original);
    }

    #[test]
    fn rejects_non_arn_strings() {
        assert!("not-an-arn".parse::<Arn>().is_err());
    }
}
