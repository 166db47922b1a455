//! Service Manager: applies/updates/deletes the `Deployment`+`Service`
//! pair a converted ECS `Service` produces, and reads back status so a
//! background reflector can update `runningCount`/`pendingCount`
//! (spec 4.3).

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service as KubeService;
use kube::api::{DeleteParams, Patch, PatchParams};
use kube::{Api, Client};

pub async fn apply(client: &Client, namespace: &str, deployment: &Deployment, service: &KubeService) -> anyhow::Result<()> {
    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let name = deployment
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("deployment missing a name"))?;
    dep_api
        .patch(name, &PatchParams::apply("kecs").force(), &Patch::Apply(deployment))
        .await?;

    let svc_api: Api<KubeService> = Api::namespaced(client.clone(), namespace);
    let svc_name = service
        .metadata
        .name
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("service missing a name"))?;
    svc_api
        .patch(svc_name, &PatchParams::apply("kecs").force(), &Patch::Apply(service))
        .await?;
    Ok(())
}

/// Scales an already-applied Deployment's replica count without
/// re-converting the whole object — the fast path for a pure
/// `desiredCount` change (spec 4.3 UpdateService).
pub async fn scale(client: &Client, namespace: &str, deployment_name: &str, replicas: i32) -> anyhow::Result<()> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let patch = serde_json::json!({ "spec": { "replicas": replicas } });
    api.patch(
        deployment_name,
        &PatchParams::apply("kecs"),
        &Patch::Merge(&patch),
    )
    .await?;
    Ok(())
}

pub async fn delete(client: &Client, namespace: &str, deployment_name: &str) -> anyhow::Result<()> {
    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    match dep_api.delete(deployment_name, &DeleteParams::default()).await {
        Ok(_) => {}
        Err(kube::Error::Api(e)) if e.code == 404 => {}
        Err(e) => return Err(e.into()),
    }
    let svc_api: Api<KubeService> = Api::namespaced(client.clone(), namespace);
    match svc_api.delete(deployment_name, &DeleteParams::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Reads back running/pending replica counts for the reflector.
pub async fn read_status(client: &Client, namespace: &str, deployment_name: &str) -> anyhow::Result<(u32, u32)> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let dep = api.get(deployment_name).await?;
    let status = dep.status.unwrap_or_default();
    let running = status.ready_replicas.unwrap_or(0).max(0) as u32;
    let desired = status.replicas.unwrap_or(0).max(0) as u32;
    let pending = desired.saturating_sub(running);
    Ok((running, pending))
}
