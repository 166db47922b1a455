//! Ingress manager: deploys Traefik into the instance's cluster as the
//! ingress controller fronting the ECS API, the admin endpoints, and the
//! UI (spec 4.5 step 7).

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;

const NAMESPACE: &str = "kecs-system";
const NAME: &str = "kecs-traefik";
const IMAGE: &str = "traefik:v3.0";

pub async fn deploy(client: &Client) -> anyhow::Result<()> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), NAME.to_string());

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(NAME.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "traefik".to_string(),
                        image: Some(IMAGE.to_string()),
                        args: Some(vec![
                            "--providers.kubernetesingress".to_string(),
                            "--entrypoints.web.address=:80".to_string(),
                        ]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    };

    let api: Api<Deployment> = Api::namespaced(client.clone(), NAMESPACE);
    api.patch(NAME, &PatchParams::apply("kecs").force(), &Patch::Apply(&deployment))
        .await?;
    Ok(())
}

pub async fn is_healthy(client: &Client) -> anyhow::Result<bool> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), NAMESPACE);
    match api.get_opt(NAME).await? {
        Some(dep) => Ok(dep
            .status
            .and_then(|s| s.ready_replicas)
            .unwrap_or(0)
            > 0),
        None => Ok(false),
    }
}
