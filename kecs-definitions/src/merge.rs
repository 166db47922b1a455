//! Patch/merge semantics for `UpdateService`.
//!
//! Keeps "does this change require re-deriving the Kubernetes objects"
//! logic in one small, testable place rather than scattered through the
//! handler.

use crate::arn::Arn;
use crate::structs::common::NetworkConfiguration;
use crate::structs::service::{DeploymentConfiguration, LoadBalancer, Service};

/// Fields an `UpdateService` call may patch. `None` means "leave as-is".
#[derive(Debug, Clone, Default)]
pub struct ServicePatch {
    pub desired_count: Option<u32>,
    pub task_definition_arn: Option<Arn>,
    pub network_configuration: Option<NetworkConfiguration>,
    pub load_balancers: Option<Vec<LoadBalancer>>,
    pub deployment_configuration: Option<DeploymentConfiguration>,
    pub health_check_grace_period_seconds: Option<u32>,
}

/// Outcome of applying a patch: whether anything "shape-changing" requires
/// re-converting and re-applying the Kubernetes `Deployment`/`Service` pair,
/// versus a pure count change that only needs `replicas` bumped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchEffect {
    pub shape_changed: bool,
    pub desired_count_changed: bool,
}

/// Apply `patch` onto `service` in place, returning what changed.
pub fn apply_service_patch(service: &mut Service, patch: &ServicePatch) -> PatchEffect {
    let mut shape_changed = false;
    let mut desired_count_changed = false;

    if let Some(dc) = patch.desired_count {
        if dc != service.desired_count {
            desired_count_changed = true;
        }
        service.desired_count = dc;
    }
    if let Some(td) = &patch.task_definition_arn {
        if td != &service.task_definition_arn {
            shape_changed = true;
        }
        service.task_definition_arn = td.clone();
    }
    if let Some(nc) = &patch.network_configuration {
        shape_changed = true;
        service.network_configuration = Some(nc.clone());
    }
    if let Some(lbs) = &patch.load_balancers {
        shape_changed = true;
        service.load_balancers = lbs.clone();
    }
    if let Some(dconf) = patch.deployment_configuration {
        service.deployment_configuration = dconf;
    }
    if let Some(grace) = patch.health_check_grace_period_seconds {
        service.health_check_grace_period_seconds = Some(grace);
    }

    PatchEffect {
        shape_changed,
        desired_count_changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::ServiceStatus;

    fn sample_service() -> Service {
        Service {
            arn: Arn::service("us-east-1", "1", "prod", "web-svc"),
            name: "web-svc".into(),
            cluster_arn: Arn::cluster("us-east-1", "1", "prod"),
            task_definition_arn: Arn::task_definition("us-east-1", "1", "web", 1),
            desired_count: 2,
            running_count: 2,
            pending_count: 0,
            launch_type: crate::structs::service::LaunchType::Fargate,
            platform_version: None,
            scheduling_strategy: Default::default(),
            status: ServiceStatus::Active,
            load_balancers: vec![],
            service_registries: vec![],
            network_configuration: None,
            deployment_configuration: Default::default(),
            placement_constraints: vec![],
            capacity_provider_strategy: vec![],
            tags: vec![],
            health_check_grace_period_seconds: None,
            enable_execute_command: false,
            propagate_tags: None,
            kube_namespace: "prod-us-east-1".into(),
            kube_deployment_name: "ecs-service-web-svc".into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn desired_count_only_change_is_not_shape_changing() {
        let mut svc = sample_service();
        let patch = ServicePatch {
            desired_count: Some(5),
            ..Default::default()
        };
        let effect = apply_service_patch(&mut svc, &patch);
        assert!(effect.desired_count_changed);
        assert!(!effect.shape_changed);
        assert_eq!(svc.desired_count, 5);
    }

    #[test]
    fn task_definition_change_is_shape_changing() {
        let mut svc = sample_service();
        let patch = ServicePatch {
            task_definition_arn: Some(Arn::task_definition("us-east-1", "1", "web", 2)),
            ..Default::default()
        };
        let effect = apply_service_patch(&mut svc, &patch);
        assert!(effect.shape_changed);
        assert!(!effect.desired_count_changed);
    }
}
