use super::{not_found, Page, SqlResultExt, Store};
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::structs::Task;
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn create_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(task)?;
        conn.execute(
            "INSERT INTO tasks (arn, cluster_arn, payload) VALUES (?1, ?2, ?3)",
            params![task.arn.to_string(), task.cluster_arn.to_string(), payload],
        )
        .sql()?;
        Ok(())
    }

    pub fn update_task(&self, task: &Task) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(task)?;
        let rows = conn
            .execute(
                "UPDATE tasks SET payload = ?1 WHERE arn = ?2",
                params![payload, task.arn.to_string()],
            )
            .sql()?;
        if rows == 0 {
            return Err(not_found("task", &task.arn.to_string()));
        }
        Ok(())
    }

    pub fn delete_task(&self, arn: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM tasks WHERE arn = ?1", params![arn])
            .sql()?;
        if rows == 0 {
            return Err(not_found("task", arn));
        }
        Ok(())
    }

    pub fn get_task_by_arn(&self, arn: &str) -> Result<Task> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM tasks WHERE arn = ?1",
                params![arn],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("task", arn)),
        }
    }

    pub fn list_tasks(
        &self,
        cluster_arn: &str,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Page<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT rowid, payload FROM tasks WHERE cluster_arn = ?1 AND rowid > ?2 ORDER BY rowid LIMIT ?3",
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
            items.push(serde_json::from_str::<Task>(&payload).map_err(ApiError::from)?);
        }
        let next_token = if items.len() > limit {
            items.truncate(limit);
            Some(kecs_definitions::pagination::encode_cursor(last_rowid))
        } else {
            None
        };
        Ok(Page { items, next_token })
    }

    /// Tasks belonging to a service's `group` (`service:<name>`), used by
    /// the reflector to compute a service's running/pending counts.
    pub fn list_tasks_for_group(&self, cluster_arn: &str, group: &str) -> Result<Vec<Task>> {
        let page = self.list_tasks(cluster_arn, None, usize::MAX)?;
        Ok(page
            .items
            .into_iter()
            .filter(|t| t.group.as_deref() == Some(group))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::states::TaskLifecycle;

    fn sample(cluster: &str, group: Option<&str>) -> Task {
        Task {
            id: uuid::Uuid::new_v4(),
            arn: Arn::task("us-east-1", "1", cluster, "abc"),
            cluster_arn: Arn::cluster("us-east-1", "1", cluster),
            task_definition_arn: Arn::task_definition("us-east-1", "1", "web", 1),
            last_status: TaskLifecycle::Provisioning,
            desired_status: TaskLifecycle::Running,
            launch_type: None,
            started_by: None,
            group: group.map(str::to_string),
            cpu: None,
            memory: None,
            containers: vec![],
            started_at: None,
            stopped_at: None,
            stopped_reason: None,
            health_status: Default::default(),
            attachments: vec![],
        }
    }

    #[test]
    fn filters_tasks_by_group() {
        let store = Store::open_in_memory().unwrap();
        let cluster_arn = Arn::cluster("us-east-1", "1", "prod").to_string();
        store
            .create_task(&sample("prod", Some("service:web-svc")))
            .unwrap();
        store.create_task(&sample("prod", None)).unwrap();
        let tasks = store
            .list_tasks_for_group(&cluster_arn, "service:web-svc")
            .unwrap();
        assert_eq!(tasks.len(), 1);
    }
}
