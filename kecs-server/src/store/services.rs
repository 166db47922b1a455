use super::{not_found, Page, SqlResultExt, Store};
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::structs::Service;
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn create_service(&self, service: &Service) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(service)?;
        conn.execute(
            "INSERT INTO services (arn, cluster_arn, name, payload) VALUES (?1, ?2, ?3, ?4)",
            params![
                service.arn.to_string(),
                service.cluster_arn.to_string(),
                service.name,
                payload
            ],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref se, _)
                if se.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                ApiError::InvalidParameter(format!(
                    "service {} already exists in this cluster",
                    service.name
                ))
            }
            other => ApiError::Internal(anyhow::Error::from(other)),
        })?;
        Ok(())
    }

    pub fn update_service(&self, service: &Service) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(service)?;
        let rows = conn
            .execute(
                "UPDATE services SET payload = ?1 WHERE arn = ?2",
                params![payload, service.arn.to_string()],
            )
            .sql()?;
        if rows == 0 {
            return Err(not_found("service", &service.arn.to_string()));
        }
        Ok(())
    }

    pub fn delete_service(&self, arn: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM services WHERE arn = ?1", params![arn])
            .sql()?;
        if rows == 0 {
            return Err(not_found("service", arn));
        }
        Ok(())
    }

    pub fn get_service_by_arn(&self, arn: &str) -> Result<Service> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM services WHERE arn = ?1",
                params![arn],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("service", arn)),
        }
    }

    pub fn get_service_by_name(&self, cluster_arn: &str, name: &str) -> Result<Service> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM services WHERE cluster_arn = ?1 AND name = ?2",
                params![cluster_arn, name],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("service", name)),
        }
    }

    pub fn list_services(
        &self,
        cluster_arn: &str,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Page<Service>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT rowid, payload FROM services WHERE cluster_arn = ?1 AND rowid > ?2 ORDER BY rowid LIMIT ?3",
            )
            .sql()?;
        let rows = stmt
            .query_map(
                params![cluster_arn, after.unwrap_or(0), limit as i64 + 1],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .sql()?;
        let mut items = Vec::new();
        let mut last_rowid = after.unwrap_or(0);
        for row in rows {
            let (rowid, payload) = row.sql()?;
            last_rowid = rowid;
            items.push(serde_json::from_str::<Service>(&payload).map_err(ApiError::from)?);
        }
        let next_token = if items.len() > limit {
            items.truncate(limit);
            Some(kecs_definitions::pagination::encode_cursor(last_rowid))
        } else {
            None
        };
        Ok(Page { items, next_token })
    }

    /// Recount of `active_services_count` per the spec invariant: services
    /// in {ACTIVE, DRAINING, PENDING, PROVISIONING}.
    pub fn count_active_services(&self, cluster_arn: &str) -> Result<u32> {
        let page = self.list_services(cluster_arn, None, usize::MAX)?;
        Ok(page
            .items
            .iter()
            .filter(|s| s.status.counts_as_active())
            .count() as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::states::ServiceStatus;
    use kecs_definitions::structs::service::{LaunchType, SchedulingStrategy};

    fn sample(cluster: &str, name: &str) -> Service {
        Service {
            arn: Arn::service("us-east-1", "1", cluster, name),
            name: name.to_string(),
            cluster_arn: Arn::cluster("us-east-1", "1", cluster),
            task_definition_arn: Arn::task_definition("us-east-1", "1", "web", 1),
            desired_count: 1,
            running_count: 0,
            pending_count: 0,
            launch_type: LaunchType::Fargate,
            platform_version: None,
            scheduling_strategy: SchedulingStrategy::Replica,
            status: ServiceStatus::Provisioning,
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
            kube_namespace: format!("{cluster}-us-east-1"),
            kube_deployment_name: format!("ecs-service-{name}"),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn duplicate_name_in_same_cluster_rejected() {
        let store = Store::open_in_memory().unwrap();
        let s = sample("prod", "web-svc");
        store.create_service(&s).unwrap();
        let err = store.create_service(&s).unwrap_err();
        assert!(matches!(err, ApiError::InvalidParameter(_)));
    }

    #[test]
    fn active_service_count_follows_status_set() {
        let store = Store::open_in_memory().unwrap();
        let cluster_arn = Arn::cluster("us-east-1", "1", "prod").to_string();
        let mut a = sample("prod", "a");
        a.status = ServiceStatus::Active;
        store.create_service(&a).unwrap();
        let mut b = sample("prod", "b");
        b.status = ServiceStatus::Inactive;
        store.create_service(&b).unwrap();
        assert_eq!(store.count_active_services(&cluster_arn).unwrap(), 1);
    }
}
