use super::{not_found, Page, SqlResultExt, Store};
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::structs::TaskSet;
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn create_task_set(&self, ts: &TaskSet) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(ts)?;
        conn.execute(
            "INSERT INTO task_sets (arn, service_arn, payload) VALUES (?1, ?2, ?3)",
            params![ts.arn.to_string(), ts.service_arn.to_string(), payload],
        )
        .sql()?;
        Ok(())
    }

    pub fn update_task_set(&self, ts: &TaskSet) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(ts)?;
        let rows = conn
            .execute(
                "UPDATE task_sets SET payload = ?1 WHERE arn = ?2",
                params![payload, ts.arn.to_string()],
            )
            .sql()?;
        if rows == 0 {
            return Err(not_found("task_set", &ts.arn.to_string()));
        }
        Ok(())
    }

    pub fn delete_task_set(&self, arn: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM task_sets WHERE arn = ?1", params![arn])
            .sql()?;
        if rows == 0 {
            return Err(not_found("task_set", arn));
        }
        Ok(())
    }

    pub fn get_task_set_by_arn(&self, arn: &str) -> Result<TaskSet> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM task_sets WHERE arn = ?1",
                params![arn],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("task_set", arn)),
        }
    }

    pub fn list_task_sets(&self, service_arn: &str) -> Result<Page<TaskSet>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM task_sets WHERE service_arn = ?1 ORDER BY rowid")
            .sql()?;
        let rows = stmt
            .query_map(params![service_arn], |row| row.get::<_, String>(0))
            .sql()?;
        let mut items = Vec::new();
        for r in rows {
            items.push(serde_json::from_str::<TaskSet>(&r.sql()?).map_err(ApiError::from)?);
        }
        Ok(Page {
            items,
            next_token: None,
        })
    }

    /// Enforces "at most one primary per service" by demoting any existing
    /// primary before marking `arn` primary.
    pub fn set_primary_task_set(&self, service_arn: &str, arn: &str) -> Result<()> {
        let page = self.list_task_sets(service_arn)?;
        for mut ts in page.items {
            let is_target = ts.arn.to_string() == arn;
            if ts.is_primary != is_target {
                ts.is_primary = is_target;
                ts.status = if is_target {
                    kecs_definitions::structs::task_set::TaskSetStatus::Primary
                } else {
                    kecs_definitions::structs::task_set::TaskSetStatus::Active
                };
                self.update_task_set(&ts)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::structs::task_set::{Scale, StabilityStatus, TaskSetStatus};

    fn sample(service_arn: &Arn, id: &str) -> TaskSet {
        TaskSet {
            id: id.to_string(),
            arn: Arn::task_set("us-east-1", "1", "prod", "web-svc", id),
            service_arn: service_arn.clone(),
            cluster_arn: Arn::cluster("us-east-1", "1", "prod"),
            status: TaskSetStatus::Active,
            stability_status: StabilityStatus::Stabilizing,
            computed_desired_count: 1,
            running_count: 0,
            pending_count: 0,
            scale: Scale::default(),
            external_id: None,
            launch_type: None,
            is_primary: false,
        }
    }

    #[test]
    fn only_one_primary_at_a_time() {
        let store = Store::open_in_memory().unwrap();
        let service_arn = Arn::service("us-east-1", "1", "prod", "web-svc");
        let a = sample(&service_arn, "ts-a");
        let b = sample(&service_arn, "ts-b");
        store.create_task_set(&a).unwrap();
        store.create_task_set(&b).unwrap();

        store
            .set_primary_task_set(&service_arn.to_string(), &a.arn.to_string())
            .unwrap();
        store
            .set_primary_task_set(&service_arn.to_string(), &b.arn.to_string())
            .unwrap();

        let fetched_a = store.get_task_set_by_arn(&a.arn.to_string()).unwrap();
        let fetched_b = store.get_task_set_by_arn(&b.arn.to_string()).unwrap();
        assert!(!fetched_a.is_primary);
        assert!(fetched_b.is_primary);
    }
}
