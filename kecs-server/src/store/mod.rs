//! Persistent store: typed CRUD over Clusters, Services, Tasks,
//! TaskDefinitions, TaskSets, Accounts.
//!
//! Backed by SQLite through `rusqlite`+`r2d2`, one table per entity, with a
//! JSON payload column plus indexed columns for the fields the spec
//! requires filtering on. Grounded on `ramparte-deployotron`'s embedded
//! `rusqlite` store and on the ECS table shape in the `cloudemu` AWS data
//! plane example (`aws_ecs_clusters`, `aws_ecs_task_definitions`,
//! `MAX(revision) + 1`).

pub mod accounts;
pub mod attributes;
pub mod clusters;
pub mod services;
pub mod task_definitions;
pub mod task_sets;
pub mod tasks;

use kecs_definitions::error::ApiError;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

pub type Pool = r2d2::Pool<SqliteConnectionManager>;
pub type Conn = r2d2::PooledConnection<SqliteConnectionManager>;

#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS clusters (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    arn TEXT UNIQUE NOT NULL,
    name TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS task_definitions (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    arn TEXT UNIQUE NOT NULL,
    family TEXT NOT NULL,
    revision INTEGER NOT NULL,
    payload TEXT NOT NULL,
    UNIQUE(family, revision)
);
CREATE TABLE IF NOT EXISTS services (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    arn TEXT UNIQUE NOT NULL,
    cluster_arn TEXT NOT NULL,
    name TEXT NOT NULL,
    payload TEXT NOT NULL,
    UNIQUE(cluster_arn, name)
);
CREATE TABLE IF NOT EXISTS tasks (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    arn TEXT UNIQUE NOT NULL,
    cluster_arn TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS task_sets (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    arn TEXT UNIQUE NOT NULL,
    service_arn TEXT NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS accounts (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT UNIQUE NOT NULL,
    payload TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attributes (
    rowid INTEGER PRIMARY KEY AUTOINCREMENT,
    cluster_arn TEXT NOT NULL,
    target_id TEXT NOT NULL,
    name TEXT NOT NULL,
    value TEXT,
    UNIQUE(cluster_arn, target_id, name)
);
";

impl Store {
    /// Open (creating if absent) the sqlite file at `<data_dir>/kecs.sqlite3`.
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let manager = SqliteConnectionManager::file(data_dir.join("kecs.sqlite3"));
        let pool = r2d2::Pool::builder().max_size(8).build(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store { pool })
    }

    /// In-memory store for tests and `KECS_TEST_MODE` runs.
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let manager = SqliteConnectionManager::memory();
        // A single-connection pool: sqlite `:memory:` databases are
        // per-connection, so pooling more than one would silently lose data.
        let pool = r2d2::Pool::builder().max_size(1).build(manager)?;
        let conn = pool.get()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store { pool })
    }

    pub fn conn(&self) -> anyhow::Result<Conn> {
        Ok(self.pool.get()?)
    }
}

/// Adapts `rusqlite::Result` into the crate-wide `ApiError` result without
/// violating the orphan rule (both `ApiError` and `rusqlite::Error` are
/// foreign to this crate, so a `From` impl isn't available).
pub(crate) trait SqlResultExt<T> {
    fn sql(self) -> Result<T, ApiError>;
}

impl<T> SqlResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn sql(self) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::Internal(anyhow::Error::from(e)))
    }
}

impl<T> SqlResultExt<T> for std::result::Result<T, r2d2::Error> {
    fn sql(self) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::Internal(anyhow::Error::from(e)))
    }
}

pub(crate) fn not_found(kind: &str, id: &str) -> ApiError {
    match kind {
        "cluster" => ApiError::ClusterNotFound(id.to_string()),
        "service" => ApiError::ServiceNotFound(id.to_string()),
        "task" => ApiError::TaskNotFound(id.to_string()),
        "task_definition" => ApiError::TaskDefinitionNotFound(id.to_string()),
        "task_set" => ApiError::TaskSetNotFound(id.to_string()),
        _ => ApiError::ClientException(format!("{kind} {id} not found")),
    }
}

/// A page of rows plus the opaque continuation token.
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}
