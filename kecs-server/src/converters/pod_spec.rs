//! `TaskDefinition` (+ overrides) → `PodSpec`.
//!
//! One ECS container definition becomes one Kubernetes container;
//! `essential = false` containers are modeled as ordinary sidecars with no
//! special failure propagation (spec 4.2), since Kubernetes pod phase is
//! already the conjunction of all container states regardless of ECS's
//! `essential` flag — nothing extra is needed to get that behavior.

use super::secret_naming::{secrets_manager_secret_name, ssm_secret_name};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, EnvVarSource, ExecAction, HostPathVolumeSource, PodSpec,
    Probe, ResourceRequirements, SecretKeySelector, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kecs_definitions::structs::task_definition::ContainerDefinition;
use kecs_definitions::structs::TaskDefinition;
use std::collections::BTreeMap;

/// `RunTask`/`StartTask` overrides: per-container command/environment
/// replacements layered onto the task definition's containers.
#[derive(Debug, Clone, Default)]
pub struct RunTaskOverrides {
    pub container_overrides: Vec<ContainerOverride>,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerOverride {
    pub name: String,
    pub command: Option<Vec<String>>,
    pub environment: Vec<kecs_definitions::structs::KeyValuePair>,
}

pub fn container_definitions_to_pod_spec(
    task_def: &TaskDefinition,
    overrides: &RunTaskOverrides,
    service_account_name: Option<&str>,
) -> PodSpec {
    let mut volumes = Vec::new();
    for vol in &task_def.volumes {
        volumes.push(Volume {
            name: vol.name.clone(),
            host_path: vol.host_path.as_ref().map(|p| HostPathVolumeSource {
                path: p.clone(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    let containers = task_def
        .container_definitions
        .iter()
        .map(|cd| {
            let ov = overrides
                .container_overrides
                .iter()
                .find(|o| o.name == cd.name);
            container_definition_to_container(cd, ov)
        })
        .collect();

    PodSpec {
        containers,
        volumes: if volumes.is_empty() { None } else { Some(volumes) },
        service_account_name: service_account_name.map(String::from),
        restart_policy: Some("Never".to_string()),
        ..Default::default()
    }
}

fn container_definition_to_container(
    cd: &ContainerDefinition,
    ov: Option<&ContainerOverride>,
) -> Container {
    let ports: Vec<ContainerPort> = cd
        .port_mappings
        .iter()
        .filter_map(|pm| {
            pm.container_port.map(|cp| ContainerPort {
                container_port: cp as i32,
                host_port: pm.host_port.map(|h| h as i32),
                protocol: pm.protocol.clone().map(|p| p.to_uppercase()),
                name: pm.name.clone(),
                ..Default::default()
            })
        })
        .collect();

    let mut env: Vec<EnvVar> = cd
        .environment
        .iter()
        .map(|kv| EnvVar {
            name: kv.name.clone(),
            value: kv.value.clone(),
            ..Default::default()
        })
        .collect();

    for secret in &cd.secrets {
        let (secret_name, json_key) = if secret.is_secrets_manager() {
            (secrets_manager_secret_name(&secret.value_from), None::<String>)
        } else if secret.is_ssm() {
            (ssm_secret_name(&secret.value_from), None)
        } else {
            continue;
        };
        let key = json_key.unwrap_or_else(|| secret.name.clone());
        env.push(EnvVar {
            name: secret.name.clone(),
            value_from: Some(EnvVarSource {
                secret_key_ref: Some(SecretKeySelector {
                    name: secret_name,
                    key,
                    optional: Some(false),
                }),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    if let Some(ov) = ov {
        for kv in &ov.environment {
            env.retain(|e| e.name != kv.name);
            env.push(EnvVar {
                name: kv.name.clone(),
                value: kv.value.clone(),
                ..Default::default()
            });
        }
    }

    let volume_mounts: Vec<VolumeMount> = cd
        .mount_points
        .iter()
        .map(|mp| VolumeMount {
            name: mp.source_volume.clone(),
            mount_path: mp.container_path.clone(),
            read_only: Some(mp.read_only),
            ..Default::default()
        })
        .collect();

    let probe = cd.health_check.as_ref().map(|hc| Probe {
        exec: Some(ExecAction {
            command: Some(hc.command.clone()),
        }),
        period_seconds: Some(hc.interval as i32),
        timeout_seconds: Some(hc.timeout as i32),
        failure_threshold: Some(hc.retries as i32),
        initial_delay_seconds: hc.start_period.map(|p| p as i32),
        ..Default::default()
    });

    let resources = container_resources(cd);

    Container {
        name: cd.name.clone(),
        image: Some(cd.image.clone()),
        command: ov.and_then(|o| o.command.clone()).or_else(|| {
            if cd.command.is_empty() {
                None
            } else {
                Some(cd.command.clone())
            }
        }),
        ports: if ports.is_empty() { None } else { Some(ports) },
        env: if env.is_empty() { None } else { Some(env) },
        volume_mounts: if volume_mounts.is_empty() {
            None
        } else {
            Some(volume_mounts)
        },
        liveness_probe: probe.clone(),
        readiness_probe: probe,
        resources: Some(resources),
        ..Default::default()
    }
}

fn container_resources(cd: &ContainerDefinition) -> ResourceRequirements {
    let mut limits = BTreeMap::new();
    let mut requests = BTreeMap::new();
    if let Some(cpu) = cd.cpu {
        // ECS cpu units are 1/1024 of a vCPU, matching Kubernetes millicpu 1:1.
        limits.insert("cpu".to_string(), Quantity(format!("{cpu}m")));
    }
    if let Some(mem) = cd.memory {
        limits.insert("memory".to_string(), Quantity(format!("{mem}Mi")));
    }
    if let Some(mem_res) = cd.memory_reservation {
        requests.insert("memory".to_string(), Quantity(format!("{mem_res}Mi")));
    }
    ResourceRequirements {
        limits: if limits.is_empty() { None } else { Some(limits) },
        requests: if requests.is_empty() { None } else { Some(requests) },
        claims: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::structs::task_definition::{Secret, TaskDefinitionStatus};
    use kecs_definitions::structs::{ContainerDefinition as CD, KeyValuePair};

    fn sample_task_def() -> TaskDefinition {
        TaskDefinition {
            arn: Arn::task_definition("us-east-1", "1", "web", 1),
            family: "web".into(),
            revision: 1,
            status: TaskDefinitionStatus::Active,
            network_mode: None,
            requires_compatibilities: vec![],
            cpu: None,
            memory: None,
            container_definitions: vec![CD {
                name: "app".into(),
                image: "nginx:1.25".into(),
                cpu: Some(256),
                memory: Some(512),
                memory_reservation: None,
                port_mappings: vec![],
                environment: vec![KeyValuePair {
                    name: "ENV".into(),
                    value: Some("prod".into()),
                }],
                secrets: vec![Secret {
                    name: "DB_PW".into(),
                    value_from: "arn:aws:secretsmanager:us-east-1:1:secret:db-pw-A1b2C3"
                        .into(),
                }],
                mount_points: vec![],
                health_check: None,
                log_configuration: None,
                depends_on: vec![],
                essential: true,
                command: vec![],
            }],
            volumes: vec![],
            task_role_arn: None,
            execution_role_arn: None,
            placement_constraints: vec![],
            proxy_configuration: None,
            tags: vec![],
        }
    }

    #[test]
    fn maps_environment_and_secrets() {
        let td = sample_task_def();
        let spec = container_definitions_to_pod_spec(&td, &RunTaskOverrides::default(), None);
        let container = &spec.containers[0];
        let env = container.env.as_ref().unwrap();
        assert!(env.iter().any(|e| e.name == "ENV" && e.value.as_deref() == Some("prod")));
        let secret_env = env.iter().find(|e| e.name == "DB_PW").unwrap();
        let secret_ref = secret_env.value_from.as_ref().unwrap().secret_key_ref.as_ref().unwrap();
        assert_eq!(secret_ref.name, "sm-db-pw");
    }

    #[test]
    fn overrides_replace_environment_entries() {
        let td = sample_task_def();
        let overrides = RunTaskOverrides {
            container_overrides: vec![ContainerOverride {
                name: "app".into(),
                command: Some(vec!["echo".into(), "hi".into()]),
                environment: vec![KeyValuePair {
                    name: "ENV".into(),
                    value: Some("staging".into()),
                }],
            }],
        };
        let spec = container_definitions_to_pod_spec(&td, &overrides, None);
        let container = &spec.containers[0];
        assert_eq!(container.command.as_ref().unwrap(), &vec!["echo".to_string(), "hi".to_string()]);
        let env = container.env.as_ref().unwrap();
        let env_entries: Vec<_> = env.iter().filter(|e| e.name == "ENV").collect();
        assert_eq!(env_entries.len(), 1);
        assert_eq!(env_entries[0].value.as_deref(), Some("staging"));
    }

    #[test]
    fn service_account_is_set_when_provided() {
        let td = sample_task_def();
        let spec = container_definitions_to_pod_spec(&td, &RunTaskOverrides::default(), Some("web-role-sa"));
        assert_eq!(spec.service_account_name.as_deref(), Some("web-role-sa"));
    }
}
