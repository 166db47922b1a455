//! CloudWatch Logs integration (spec 4.2, 4.6).
//!
//! `logConfiguration.driver == "awslogs"` triggers creation of a log group
//! in the emulation backend and a log stream per `(task, container)`
//! named `<prefix>/<container>/<taskId>`. The node-local collector
//! (Vector) is configured via a `ConfigMap` (see
//! `crate::k8s::managers::vector`) that tails container logs using the
//! annotations this module writes onto the Pod.

use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kecs_definitions::client::{BackendClient, BackendMode};
use kecs_definitions::structs::task_definition::LogConfiguration;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};

pub const LOG_GROUP_ANNOTATION: &str = "kecs.io/log-group";
pub const LOG_STREAM_ANNOTATION: &str = "kecs.io/log-stream-prefix";

pub fn log_stream_name(prefix: &str, container_name: &str, task_id: &str) -> String {
    format!("{prefix}/{container_name}/{task_id}")
}

/// Pre-creates `<prefix>/<family>` in the emulation backend. Best-effort:
/// a group that already exists is not an error.
pub async fn ensure_log_group(backend: &BackendClient, family: &str, log_config: &LogConfiguration) -> anyhow::Result<()> {
    if backend.mode() == BackendMode::Test {
        return Ok(());
    }
    let prefix = log_config.prefix().unwrap_or(family);
    let group = format!("{prefix}/{family}");
    let body = serde_json::json!({"logGroupName": group});
    if let Err(e) = backend
        .call::<serde_json::Value>("Logs_20140328.CreateLogGroup", &body)
        .await
    {
        tracing::debug!(group, error = %e, "CloudWatch Logs CreateLogGroup not applied (likely already exists)");
    }
    Ok(())
}

/// Writes/updates the per-namespace ConfigMap Vector reads to know which
/// log groups/streams to ship container logs to. One entry per task
/// definition family sharing the namespace is merged into a single map
/// keyed by family, so concurrent service deployments don't clobber each
/// other's routing rules.
pub async fn sync_collector_routing(
    client: &Client,
    namespace: &str,
    family: &str,
    log_config: &LogConfiguration,
) -> anyhow::Result<()> {
    let api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let name = "kecs-log-routing";
    let existing = api.get_opt(name).await?;
    let mut data = existing
        .and_then(|cm| cm.data)
        .unwrap_or_default();
    let group = log_config.group().unwrap_or(family).to_string();
    data.insert(family.to_string(), group);

    let cm = ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        data: Some(data),
        ..Default::default()
    };
    api.patch(name, &PatchParams::apply("kecs").force(), &Patch::Apply(&cm))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_name_shape() {
        assert_eq!(
            log_stream_name("web", "app", "task-123"),
            "web/app/task-123"
        );
    }
}
