use super::{not_found, SqlResultExt, Store};
use kecs_definitions::error::Result;
use kecs_definitions::structs::Account;
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn upsert_account(&self, account: &Account) -> Result<()> {
        let conn = self.conn()?;
        let payload = serde_json::to_string(account)?;
        conn.execute(
            "INSERT INTO accounts (id, payload) VALUES (?1, ?2)
             ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
            params![account.id, payload],
        )
        .sql()?;
        Ok(())
    }

    pub fn get_account(&self, id: &str) -> Result<Account> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                "SELECT payload FROM accounts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .sql()?;
        match payload {
            Some(p) => Ok(serde_json::from_str(&p)?),
            None => Err(not_found("account", id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_get() {
        let store = Store::open_in_memory().unwrap();
        let acc = Account {
            id: "000000000000".into(),
            region: "us-east-1".into(),
        };
        store.upsert_account(&acc).unwrap();
        let fetched = store.get_account("000000000000").unwrap();
        assert_eq!(fetched.region, "us-east-1");
    }
}
