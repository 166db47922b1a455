use super::{not_found, Page, SqlResultExt, Store};
use kecs_definitions::error::Result;
use kecs_definitions::structs::Cluster;
use rusqlite::params;

impl Store {
    pub fn create_cluster(&self, cluster: &Cluster) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(cluster)?;
        conn.execute(
            "INSERT INTO clusters (arn, name, payload) VALUES (?1, ?2, ?3)",
            params![cluster.arn.to_string(), cluster.name, payload],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(ref se, _)
                if se.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                kecs_definitions::error::ApiError::InvalidParameter(format!(
                    "cluster {} already exists",
                    cluster.name
                ))
            }
            other => kecs_definitions::error::ApiError::Internal(anyhow::Error::from(other)),
        })?;
        Ok(())
    }

    pub fn get_cluster_by_name(&self, name: &str) -> Result<Cluster> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM clusters WHERE name = ?1")
            .sql()?;
        let payload: Option<String> = stmt.query_row(params![name], |row| row.get(0)).ok();
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("cluster", name)),
        }
    }

    pub fn get_cluster_by_arn(&self, arn: &str) -> Result<Cluster> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT payload FROM clusters WHERE arn = ?1")
            .sql()?;
        let payload: Option<String> = stmt.query_row(params![arn], |row| row.get(0)).ok();
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("cluster", arn)),
        }
    }

    pub fn update_cluster(&self, cluster: &Cluster) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(cluster)?;
        let rows = conn
            .execute(
                "UPDATE clusters SET payload = ?1 WHERE arn = ?2",
                params![payload, cluster.arn.to_string()],
            )
            .sql()?;
        if rows == 0 {
            return Err(not_found("cluster", &cluster.arn.to_string()));
        }
        Ok(())
    }

    pub fn delete_cluster(&self, arn: &str) -> Result<()> {
        let conn = self.conn()?;
        let rows = conn
            .execute("DELETE FROM clusters WHERE arn = ?1", params![arn])
            .sql()?;
        if rows == 0 {
            return Err(not_found("cluster", arn));
        }
        Ok(())
    }

    pub fn list_clusters(&self, after: Option<i64>, limit: usize) -> Result<Page<Cluster>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT rowid, payload FROM clusters WHERE rowid > ?1 ORDER BY rowid LIMIT ?2")
            .sql()?;
        let rows = stmt
            .query_map(params![after.unwrap_or(0), limit as i64 + 1], |row| {
                let rowid: i64 = row.get(0)?;
                let payload: String = row.get(1)?;
                Ok((rowid, payload))
            })
            .sql()?;
        let mut items = Vec::new();
        let mut last_rowid = after.unwrap_or(0);
        for row in rows {
            let (rowid, payload) = row.sql()?;
            last_rowid = rowid;
            let cluster: Cluster = serde_json::from_str(&payload)?;
            items.push((rowid, cluster));
        }
        let next_token = if items.len() > limit {
            items.truncate(limit);
            Some(kecs_definitions::pagination::encode_cursor(last_rowid))
        } else {
            None
        };
        Ok(Page {
            items: items.into_iter().map(|(_, c)| c).collect(),
            next_token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kecs_definitions::structs::Cluster;

    #[test]
    fn create_get_list_delete_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let c = Cluster::new("prod", "us-east-1", "1");
        store.create_cluster(&c).unwrap();

        let fetched = store.get_cluster_by_name("prod").unwrap();
        assert_eq!(fetched.name, "prod");

        let page = store.list_clusters(None, 10).unwrap();
        assert_eq!(page.items.len(), 1);
        assert!(page.next_token.is_none());

        store.delete_cluster(&c.arn.to_string()).unwrap();
        assert!(store.get_cluster_by_name("prod").is_err());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let store = Store::open_in_memory().unwrap();
        let c = Cluster::new("prod", "us-east-1", "1");
        store.create_cluster(&c).unwrap();
        let err = store.create_cluster(&c).unwrap_err();
        assert!(matches!(
            err,
            kecs_definitions::error::ApiError::InvalidParameter(_)
        ));
    }
}
