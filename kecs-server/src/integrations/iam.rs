//! IAM role → Kubernetes ServiceAccount mapping (spec 4.6).
//!
//! On `CreateService`/`RunTask` with a `taskRoleArn`, ensure an IAM role
//! exists in the emulation backend (created on first use with a standard
//! trust policy), then ensure a Kubernetes `ServiceAccount` named
//! `<rolename>-sa` in the target namespace, annotated with the role ARN so
//! pods that bind to it can be matched back to the role by anything
//! inspecting the cluster (and, in a full deployment, by an injected
//! credential-serving sidecar).

use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kecs_definitions::client::BackendClient;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use serde_json::json;
use std::collections::BTreeMap;

pub const ROLE_ARN_ANNOTATION: &str = "kecs.io/iam-role-arn";

/// `<rolename>-sa`, where `rolename` is the last path segment of the role
/// ARN's resource part (`.../role/<name>` or a bare name already).
pub fn service_account_name_for_role_arn(role_arn: &str) -> String {
    let name = role_arn
        .rsplit('/')
        .next()
        .unwrap_or(role_arn)
        .to_ascii_lowercase();
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    format!("{sanitized}-sa")
}

/// Ensures the role exists in the emulation backend. Best-effort: a
/// conflict (already exists) is not an error.
pub async fn ensure_role(backend: &BackendClient, role_arn: &str) -> anyhow::Result<()> {
    if backend.mode() == kecs_definitions::client::BackendMode::Test {
        return Ok(());
    }
    let role_name = role_arn.rsplit('/').next().unwrap_or(role_arn);
    let body = json!({
        "RoleName": role_name,
        "AssumeRolePolicyDocument": standard_trust_policy(),
    });
    // Creating a role that already exists is the steady-state case for
    // every task/service after the first; the backend's own idempotency
    // (or lack thereof) is outside this integration's control, so any
    // error here is logged rather than surfaced to the caller.
    if let Err(e) = backend.call::<serde_json::Value>("AWSIdentityManagementService.CreateRole", &body).await {
        tracing::debug!(role_arn, error = %e, "IAM CreateRole not applied (likely already exists)");
    }
    Ok(())
}

fn standard_trust_policy() -> serde_json::Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"Service": "ecs-tasks.amazonaws.com"},
            "Action": "sts:AssumeRole"
        }]
    })
}

/// Ensures a `ServiceAccount` exists in `namespace` for `role_arn`,
/// returning its name for the pod spec's `serviceAccountName`.
pub async fn ensure_service_account(
    client: &Client,
    namespace: &str,
    role_arn: &str,
) -> anyhow::Result<String> {
    let name = service_account_name_for_role_arn(role_arn);
    let api: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);

    let mut annotations = BTreeMap::new();
    annotations.insert(ROLE_ARN_ANNOTATION.to_string(), role_arn.to_string());

    let sa = ServiceAccount {
        metadata: ObjectMeta {
            name: Some(name.clone()),
            namespace: Some(namespace.to_string()),
            annotations: Some(annotations),
            ..Default::default()
        },
        ..Default::default()
    };

    api.patch(
        &name,
        &PatchParams::apply("kecs").force(),
        &Patch::Apply(&sa),
    )
    .await?;

    Ok(name)
}

/// Deletes the `ServiceAccount` for `role_arn`, if present. Deletion
/// cascades both directions per spec 4.6: the role itself is left in the
/// emulation backend (other services may still reference it).
pub async fn delete_service_account(client: &Client, namespace: &str, role_arn: &str) -> anyhow::Result<()> {
    let name = service_account_name_for_role_arn(role_arn);
    let api: Api<ServiceAccount> = Api::namespaced(client.clone(), namespace);
    match api.delete(&name, &Default::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_service_account_name_from_role_arn() {
        let arn = "arn:aws:iam::000000000000:role/web-task-role";
        assert_eq!(service_account_name_for_role_arn(arn), "web-task-role-sa");
    }

    #[test]
    fn sanitizes_unusual_role_names() {
        let arn = "arn:aws:iam::000000000000:role/team/web_task.role";
        assert_eq!(service_account_name_for_role_arn(arn), "web-task-role-sa");
    }
}
