//! S3 artifact fetch (spec 4.6).
//!
//! On task start, declared artifacts are fetched from S3 (via the
//! emulation backend) into an init container's volume before the
//! application containers start. Target path and permissions come from
//! the task definition's `proxyConfiguration`/volume properties; here we
//! model it as a single init container per task using the AWS CLI image,
//! since that is the common pattern for fetch-then-run init containers.

use k8s_openapi::api::core::v1::{Container, PodSpec, Volume, VolumeMount};

#[derive(Debug, Clone)]
pub struct S3Artifact {
    pub bucket: String,
    pub key: String,
    pub target_path: String,
}

const ARTIFACTS_VOLUME: &str = "kecs-artifacts";

/// Adds an `artifacts-init` init container (and its shared `emptyDir`
/// volume, mounted read-write on the init container and read-only on
/// every application container) to `pod_spec` for each declared artifact.
pub fn inject_artifact_fetch(pod_spec: &mut PodSpec, artifacts: &[S3Artifact], backend_base_url: &str) {
    if artifacts.is_empty() {
        return;
    }

    let commands: Vec<String> = artifacts
        .iter()
        .map(|a| {
            format!(
                "aws --endpoint-url {backend_base_url} s3 cp s3://{}/{} {}",
                a.bucket, a.key, a.target_path
            )
        })
        .collect();

    let init_container = Container {
        name: "artifacts-init".to_string(),
        image: Some("amazon/aws-cli:2.15.0".to_string()),
        command: Some(vec!["sh".to_string(), "-c".to_string(), commands.join(" && ")]),
        volume_mounts: Some(vec![VolumeMount {
            name: ARTIFACTS_VOLUME.to_string(),
            mount_path: "/kecs-artifacts".to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    };

    let mut volumes = pod_spec.volumes.take().unwrap_or_default();
    volumes.push(Volume {
        name: ARTIFACTS_VOLUME.to_string(),
        empty_dir: Some(Default::default()),
        ..Default::default()
    });
    pod_spec.volumes = Some(volumes);

    let mut init_containers = pod_spec.init_containers.take().unwrap_or_default();
    init_containers.push(init_container);
    pod_spec.init_containers = Some(init_containers);

    for container in &mut pod_spec.containers {
        let mut mounts = container.volume_mounts.take().unwrap_or_default();
        mounts.push(VolumeMount {
            name: ARTIFACTS_VOLUME.to_string(),
            mount_path: "/kecs-artifacts".to_string(),
            read_only: Some(true),
            ..Default::default()
        });
        container.volume_mounts = Some(mounts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_init_container_and_shared_volume() {
        let mut spec = PodSpec {
            containers: vec![Container {
                name: "app".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let artifacts = vec![S3Artifact {
            bucket: "my-bucket".into(),
            key: "build/app.tar".into(),
            target_path: "/kecs-artifacts/app.tar".into(),
        }];
        inject_artifact_fetch(&mut spec, &artifacts, "http://localstack:4566");

        assert_eq!(spec.init_containers.as_ref().unwrap().len(), 1);
        assert!(spec.volumes.as_ref().unwrap().iter().any(|v| v.name == ARTIFACTS_VOLUME));
        assert!(spec.containers[0]
            .volume_mounts
            .as_ref()
            .unwrap()
            .iter()
            .any(|m| m.name == ARTIFACTS_VOLUME && m.read_only == Some(true)));
    }

    #[test]
    fn no_artifacts_is_a_no_op() {
        let mut spec = PodSpec::default();
        inject_artifact_fetch(&mut spec, &[], "http://localstack:4566");
        assert!(spec.init_containers.is_none());
    }
}
