//! Emulation backend manager: deploys the co-located AWS-emulation
//! sandbox (spec GLOSSARY: "Emulation backend") into the instance's
//! cluster and exposes it via a `NodePort` Service so the control plane's
//! reverse proxy (`crate::proxy`) can reach it from outside the cluster.
//!
//! Spec 9 open question (iii): the health check against this backend is a
//! real probe against its `/health` endpoint with a 1s timeout — not the
//! "assume healthy" TODO the original bypassed it with. The probe itself
//! lives on `kecs_definitions::client::BackendClient::healthy`; this
//! module only owns getting the backend running and reachable.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};
use std::collections::BTreeMap;

const NAME: &str = "kecs-localstack";
const IMAGE: &str = "localstack/localstack:3.4";
const PORT: i32 = 4566;

pub async fn deploy(client: &Client, namespace: &str, extra_services: &[String]) -> anyhow::Result<()> {
    let mut labels = BTreeMap::new();
    labels.insert("app".to_string(), NAME.to_string());

    let services_env = if extra_services.is_empty() {
        "ecs".to_string()
    } else {
        format!("ecs,{}", extra_services.join(","))
    };

    let deployment = Deployment {
        metadata: ObjectMeta {
            name: Some(NAME.to_string()),
            namespace: Some(namespace.to_string()),
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
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: "localstack".to_string(),
                        image: Some(IMAGE.to_string()),
                        env: Some(vec![k8s_openapi::api::core::v1::EnvVar {
                            name: "SERVICES".to_string(),
                            value: Some(services_env),
                            ..Default::default()
                        }]),
                        ports: Some(vec![ContainerPort {
                            container_port: PORT,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    };

    let dep_api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    dep_api
        .patch(NAME, &PatchParams::apply("kecs").force(), &Patch::Apply(&deployment))
        .await?;

    let service = Service {
        metadata: ObjectMeta {
            name: Some(NAME.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels.clone()),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            selector: Some(labels),
            ports: Some(vec![ServicePort {
                port: PORT,
                target_port: Some(IntOrString::Int(PORT)),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    };
    let svc_api: Api<Service> = Api::namespaced(client.clone(), namespace);
    svc_api
        .patch(NAME, &PatchParams::apply("kecs").force(), &Patch::Apply(&service))
        .await?;

    Ok(())
}

pub fn internal_base_url(namespace: &str) -> String {
    format!("http://{NAME}.{namespace}.svc.cluster.local:{PORT}")
}
