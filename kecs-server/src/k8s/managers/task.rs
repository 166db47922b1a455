//! Task Manager: materializes a standalone `RunTask`/`StartTask` call as a
//! bare `Pod` (spec 4.3) and reads back its phase for the reflector to
//! advance the ECS task lifecycle state machine.

use k8s_openapi::api::core::v1::{Pod, PodSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;

pub async fn run(
    client: &Client,
    namespace: &str,
    pod_name: &str,
    labels: BTreeMap<String, String>,
    pod_spec: PodSpec,
) -> anyhow::Result<()> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pod = Pod {
        metadata: ObjectMeta {
            name: Some(pod_name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        spec: Some(pod_spec),
        status: None,
    };
    api.patch(pod_name, &PatchParams::apply("kecs").force(), &Patch::Apply(&pod))
        .await?;
    Ok(())
}

pub async fn stop(client: &Client, namespace: &str, pod_name: &str) -> anyhow::Result<()> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    match api.delete(pod_name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Maps a Kubernetes pod phase to the nearest ECS lifecycle transition the
/// reflector should request (spec 4.3's monotonic state machine handles
/// ignoring illegal or stale transitions itself).
pub fn phase_to_lifecycle(phase: &str) -> kecs_definitions::states::TaskLifecycle {
    use kecs_definitions::states::TaskLifecycle::*;
    match phase {
        "Pending" => Pending,
        "Running" => Running,
        "Succeeded" | "Failed" => Stopped,
        _ => Provisioning,
    }
}

pub async fn read_phase(client: &Client, namespace: &str, pod_name: &str) -> anyhow::Result<Option<String>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    match api.get_opt(pod_name).await? {
        Some(pod) => Ok(pod.status.and_then(|s| s.phase)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::states::TaskLifecycle;

    #[test]
    fn maps_terminal_phases_to_stopped() {
        assert_eq!(phase_to_lifecycle("Succeeded"), TaskLifecycle::Stopped);
        assert_eq!(phase_to_lifecycle("Failed"), TaskLifecycle::Stopped);
    }

    #[test]
    fn maps_running_phase() {
        assert_eq!(phase_to_lifecycle("Running"), TaskLifecycle::Running);
    }
}
