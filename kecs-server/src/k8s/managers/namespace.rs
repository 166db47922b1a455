//! Namespace Manager: one Kubernetes namespace per ECS cluster,
//! `<clusterName>-<region>` (spec 4.2, 4.5 step 6).

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client};

pub async fn ensure_namespace(client: &Client, name: &str) -> anyhow::Result<()> {
    let api: Api<Namespace> = Api::all(client.clone());
    let ns = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some([("kecs.io/managed".to_string(), "true".to_string())].into()),
            ..Default::default()
        },
        ..Default::default()
    };
    api.patch(name, &PatchParams::apply("kecs").force(), &Patch::Apply(&ns))
        .await?;
    Ok(())
}

pub async fn delete_namespace(client: &Client, name: &str) -> anyhow::Result<()> {
    let api: Api<Namespace> = Api::all(client.clone());
    match api.delete(name, &Default::default()).await {
        Ok(_) => Ok(()),
        Err(kube::Error::Api(e)) if e.code == 404 => Ok(()),
        Err(e) => Err(e.into()),
    }
}
