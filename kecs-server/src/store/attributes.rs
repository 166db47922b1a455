use super::{SqlResultExt, Store};
use kecs_definitions::error::Result;
use kecs_definitions::structs::Attribute;
use rusqlite::params;

impl Store {
    pub fn put_attribute(&self, cluster_arn: &str, target_id: &str, attr: &Attribute) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO attributes (cluster_arn, target_id, name, value) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(cluster_arn, target_id, name) DO UPDATE SET value = excluded.value",
            params![cluster_arn, target_id, attr.name, attr.value],
        )
        .sql()?;
        Ok(())
    }

    pub fn delete_attribute(&self, cluster_arn: &str, target_id: &str, name: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM attributes WHERE cluster_arn = ?1 AND target_id = ?2 AND name = ?3",
            params![cluster_arn, target_id, name],
        )
        .sql()?;
        Ok(())
    }

    pub fn list_attributes(&self, cluster_arn: &str, target_id: Option<&str>) -> Result<Vec<Attribute>> {
        let conn = self.conn()?;
        let mut out = Vec::new();
        if let Some(target_id) = target_id {
            let mut stmt = conn
                .prepare(
                    "SELECT name, value, target_id FROM attributes WHERE cluster_arn = ?1 AND target_id = ?2",
                )
                .sql()?;
            let rows = stmt
                .query_map(params![cluster_arn, target_id], |row| {
                    Ok(Attribute {
                        name: row.get(0)?,
                        value: row.get(1)?,
                        target_type: None,
                        target_id: row.get(2)?,
                    })
                })
                .sql()?;
            for r in rows {
                out.push(r.sql()?);
            }
        } else {
            let mut stmt = conn
                .prepare("SELECT name, value, target_id FROM attributes WHERE cluster_arn = ?1")
                .sql()?;
            let rows = stmt
                .query_map(params![cluster_arn], |row| {
                    Ok(Attribute {
                        name: row.get(0)?,
                        value: row.get(1)?,
                        target_type: None,
                        target_id: row.get(2)?,
                    })
                })
                .sql()?;
            for r in rows {
                out.push(r.sql()?);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_list_delete_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let attr = Attribute {
            name: "ecs.instance-type".into(),
            value: Some("t3.medium".into()),
            target_type: None,
            target_id: None,
        };
        store.put_attribute("cluster-arn", "instance-1", &attr).unwrap();
        let listed = store.list_attributes("cluster-arn", Some("instance-1")).unwrap();
        assert_eq!(listed.len(), 1);
        store
            .delete_attribute("cluster-arn", "instance-1", "ecs.instance-type")
            .unwrap();
        let listed = store.list_attributes("cluster-arn", Some("instance-1")).unwrap();
        assert!(listed.is_empty());
    }
}
