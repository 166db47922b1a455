use super::util::{after_field, limit_field, opt_str, str_field, tags_field};
use crate::app_state::AppState;
use crate::k8s::managers::namespace;
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::states::ClusterStatus;
use kecs_definitions::structs::Cluster;
use serde_json::{json, Value};

/// Resolves a `cluster` request field (bare name or full ARN) to a row.
pub fn resolve(state: &AppState, identifier: &str) -> Result<Cluster> {
    if identifier.starts_with("arn:aws:") {
        state.store.get_cluster_by_arn(identifier)
    } else {
        state.store.get_cluster_by_name(identifier)
    }
}

fn to_json(c: &Cluster) -> Value {
    json!({
        "clusterArn": c.arn.to_string(),
        "clusterName": c.name,
        "status": c.status.as_aws_str(),
        "runningTasksCount": c.running_tasks_count,
        "pendingTasksCount": c.pending_tasks_count,
        "activeServicesCount": c.active_services_count,
        "registeredContainerInstancesCount": c.registered_container_instances_count,
        "tags": c.tags,
        "capacityProviders": c.capacity_providers,
    })
}

pub async fn create_cluster(state: &AppState, body: Value) -> Result<Value> {
    let name = opt_str(&body, "clusterName").unwrap_or("default").to_string();
    Cluster::validate_name(&name).map_err(ApiError::InvalidParameter)?;

    let mut cluster = Cluster::new(&name, &state.config.region, &state.config.account_id);
    cluster.tags = tags_field(&body);
    cluster.status = ClusterStatus::Provisioning;
    state.store.create_cluster(&cluster)?;

    if let Ok(client) = state.kube_client() {
        if let Err(e) = namespace::ensure_namespace(client, &cluster.kube_namespace).await {
            cluster.status = ClusterStatus::Failed;
            state.store.update_cluster(&cluster)?;
            return Err(ApiError::Internal(e));
        }
    }
    cluster.status = ClusterStatus::Active;
    state.store.update_cluster(&cluster)?;

    Ok(json!({ "cluster": to_json(&cluster) }))
}

pub async fn delete_cluster(state: &AppState, body: Value) -> Result<Value> {
    let identifier = str_field(&body, "cluster")?;
    let mut cluster = resolve(state, identifier)?;
    cluster.status = ClusterStatus::Deprovisioning;
    state.store.update_cluster(&cluster)?;

    if let Ok(client) = state.kube_client() {
        namespace::delete_namespace(client, &cluster.kube_namespace)
            .await
            .map_err(ApiError::Internal)?;
    }
    state.store.delete_cluster(&cluster.arn.to_string())?;
    Ok(json!({ "cluster": to_json(&cluster) }))
}

pub async fn describe_clusters(state: &AppState, body: Value) -> Result<Value> {
    let identifiers = body
        .get("clusters")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_else(|| vec!["default".to_string()]);

    let mut clusters = Vec::new();
    let mut failures = Vec::new();
    for id in identifiers {
        match resolve(state, &id) {
            Ok(c) => clusters.push(to_json(&c)),
            Err(_) => failures.push(json!({ "arn": id, "reason": "MISSING" })),
        }
    }
    Ok(json!({ "clusters": clusters, "failures": failures }))
}

pub async fn list_clusters(state: &AppState, body: Value) -> Result<Value> {
    let page = state.store.list_clusters(after_field(&body), limit_field(&body, 100))?;
    Ok(json!({
        "clusterArns": page.items.iter().map(|c| c.arn.to_string()).collect::<Vec<_>>(),
        "nextToken": page.next_token,
    }))
}
