use super::{not_found, Page, SqlResultExt, Store};
use kecs_definitions::error::{ApiError, Result};
use kecs_definitions::structs::TaskDefinition;
use rusqlite::{params, OptionalExtension};

impl Store {
    /// Registers a new revision: `max(existing revision for family) + 1`,
    /// grounded on the `MAX(revision) + 1` pattern used for ECS task
    /// definitions in the `cloudemu` storage engine.
    pub fn next_task_definition_revision(&self, family: &str) -> Result<u32> {
        let conn = self.conn()?;
        let max: Option<i64> = conn
            .query_row(
                "SELECT MAX(revision) FROM task_definitions WHERE family = ?1",
                params![family],
                |row| row.get(0),
            )
            .optional()
            .sql()?
            .flatten();
        Ok(max.unwrap_or(0) as u32 + 1)
    }

    pub fn create_task_definition(&self, td: &TaskDefinition) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(td)?;
        conn.execute(
            "INSERT INTO task_definitions (arn, family, revision, payload) VALUES (?1, ?2, ?3, ?4)",
            params![td.arn.to_string(), td.family, td.revision, payload],
        )
        .sql()?;
        Ok(())
    }

    pub fn update_task_definition(&self, td: &TaskDefinition) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(td)?;
        let rows = conn
            .execute(
                "UPDATE task_definitions SET payload = ?1 WHERE arn = ?2",
                params![payload, td.arn.to_string()],
            )
            .sql()?;
        if rows == 0 {
            return Err(not_found("task_definition", &td.arn.to_string()));
        }
        Ok(())
    }

    pub fn get_task_definition_by_arn(&self, arn: &str) -> Result<TaskDefinition> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM task_definitions WHERE arn = ?1",
                params![arn],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("task_definition", arn)),
        }
    }

    pub fn get_task_definition_revision(&self, family: &str, revision: u32) -> Result<TaskDefinition> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM task_definitions WHERE family = ?1 AND revision = ?2",
                params![family, revision],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found(
                "task_definition",
                &format!("{family}:{revision}"),
            )),
        }
    }

    /// family-only lookups select the latest `ACTIVE` revision.
    pub fn get_latest_active_task_definition(&self, family: &str) -> Result<TaskDefinition> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT payload FROM task_definitions WHERE family = ?1 ORDER BY revision DESC",
            )
            .sql()?;
        let mut rows = stmt.query(params![family]).sql()?;
        while let Some(row) = rows.next().sql()? {
            let payload: String = row.get(0).sql()?;
            let td: TaskDefinition = serde_json::from_str(&payload)?;
            if matches!(
                td.status,
                kecs_definitions::structs::task_definition::TaskDefinitionStatus::Active
            ) {
                return Ok(td);
            }
        }
        Err(not_found("task_definition", family))
    }

    /// Resolve a task definition identifier that may be a bare family, a
    /// `family:revision` shorthand, or a full ARN.
    pub fn resolve_task_definition(&self, identifier: &str) -> Result<TaskDefinition> {
        if identifier.starts_with("arn:aws:") {
            return self.get_task_definition_by_arn(identifier);
        }
        if let Some((family, rev)) = identifier.rsplit_once(':') {
            if let Ok(revision) = rev.parse::<u32>() {
                return self.get_task_definition_revision(family, revision);
            }
        }
        self.get_latest_active_task_definition(identifier)
    }

    pub fn deregister_task_definition(&self, arn: &str) -> Result<TaskDefinition> {
        let mut td = self.get_task_definition_by_arn(arn)?;
        td.status = kecs_definitions::structs::task_definition::TaskDefinitionStatus::Inactive;
        self.update_task_definition(&td)?;
        Ok(td)
    }

    pub fn list_task_definition_families(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT family FROM task_definitions ORDER BY family")
            .sql()?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).sql()?;
        let mut out = Vec::new();
        for r in rows {
            out.push(r.sql()?);
        }
        Ok(out)
    }

    pub fn list_task_definitions(
        &self,
        family: Option<&str>,
        after: Option<i64>,
        limit: usize,
    ) -> Result<Page<TaskDefinition>> {
        let conn = self.conn()?;
        let (sql, family_owned);
        let rows_iter: Vec<(i64, String)> = if let Some(f) = family {
            family_owned = f.to_string();
            sql = "SELECT rowid, payload FROM task_definitions WHERE family = ?1 AND rowid > ?2 ORDER BY rowid LIMIT ?3";
            let mut stmt = conn.prepare(sql).sql()?;
            let rows = stmt
                .query_map(
                    params![family_owned, after.unwrap_or(0), limit as i64 + 1],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .sql()?;
            let mut v = Vec::new();
            for r in rows {
                v.push(r.sql()?);
            }
            v
        } else {
            let mut stmt = conn
                .prepare(
                    "SELECT rowid, payload FROM task_definitions WHERE rowid > ?1 ORDER BY rowid LIMIT ?2",
                )
                .sql()?;
            let rows = stmt
                .query_map(params![after.unwrap_or(0), limit as i64 + 1], |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })
                .sql()?;
            let mut v = Vec::new();
            for r in rows {
                v.push(r.sql()?);
            }
            v
        };

        let mut items = Vec::new();
        let mut last_rowid = after.unwrap_or(0);
        for (rowid, payload) in rows_iter {
            last_rowid = rowid;
            let td: TaskDefinition = serde_json::from_str(&payload).map_err(ApiError::from)?;
            items.push(td);
        }
        let next_token = if items.len() > limit {
            items.truncate(limit);
            Some(kecs_definitions::pagination::encode_cursor(last_rowid))
        } else {
            None
        };
        Ok(Page { items, next_token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::arn::Arn;
    use kecs_definitions::structs::task_definition::TaskDefinitionStatus;

    fn sample(family: &str, revision: u32) -> TaskDefinition {
        TaskDefinition {
            arn: Arn::task_definition("us-east-1", "1", family, revision),
            family: family.to_string(),
            revision,
            status: TaskDefinitionStatus::Active,
            network_mode: None,
            requires_compatibilities: vec![],
            cpu: None,
            memory: None,
            container_definitions: vec![],
            volumes: vec![],
            task_role_arn: None,
            execution_role_arn: None,
            placement_constraints: vec![],
            proxy_configuration: None,
            tags: vec![],
        }
    }

    #[test]
    fn revisions_are_dense_and_monotonic() {
        let store = Store::open_in_memory().unwrap();
        assert_eq!(store.next_task_definition_revision("web").unwrap(), 1);
        store.create_task_definition(&sample("web", 1)).unwrap();
        assert_eq!(store.next_task_definition_revision("web").unwrap(), 2);
        store.create_task_definition(&sample("web", 2)).unwrap();
        assert_eq!(store.next_task_definition_revision("web").unwrap(), 3);
    }

    #[test]
    fn family_only_resolves_latest_active() {
        let store = Store::open_in_memory().unwrap();
        store.create_task_definition(&sample("web", 1)).unwrap();
        store.create_task_definition(&sample("web", 2)).unwrap();
        let resolved = store.resolve_task_definition("web").unwrap();
        assert_eq!(resolved.revision, 2);
    }

    #[test]
    fn deregister_flips_status_never_deletes() {
        let store = Store::open_in_memory().unwrap();
        let td = sample("web", 1);
        store.create_task_definition(&td).unwrap();
        store.deregister_task_definition(&td.arn.to_string()).unwrap();
        let fetched = store.get_task_definition_by_arn(&td.arn.to_string()).unwrap();
        assert_eq!(fetched.status, TaskDefinitionStatus::Inactive);
    }
}
