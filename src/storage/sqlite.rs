//! SQLite storage implementation

use super::schema;
use super::{EngineConnector, LocationEngine};
use crate::coordinate::Coordinate;
use crate::{Error, Result};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// SQLite-backed primary engine for the location record
pub struct SqliteEngine {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEngine {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        initialize_schema(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        initialize_schema(&mut conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::StorageUnavailable("connection lock poisoned".to_string()))?;
            f(&mut *guard)
        })
        .await?
    }
}

/// Bring the schema up to [`schema::SCHEMA_VERSION`], refusing newer databases.
fn initialize_schema(conn: &mut Connection) -> Result<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if version > schema::SCHEMA_VERSION {
        return Err(Error::StorageUnavailable(format!(
            "{} schema version {} is newer than supported version {}",
            schema::DATABASE_NAME,
            version,
            schema::SCHEMA_VERSION
        )));
    }

    if version < schema::SCHEMA_VERSION {
        tracing::debug!(
            "Upgrading {} ({}) from version {} to {}",
            schema::DATABASE_NAME,
            schema::LOCATION_TABLE,
            version,
            schema::SCHEMA_VERSION
        );
        let tx = conn.transaction()?;
        for stmt in schema::upgrade_statements(version) {
            tx.execute(stmt, [])?;
        }
        tx.pragma_update(None, "user_version", schema::SCHEMA_VERSION)?;
        tx.commit()?;
    }

    Ok(())
}

fn read_record(conn: &Connection, key: &str) -> Result<Option<Coordinate>> {
    conn.query_row(schema::SELECT_LOCATION, [key], |row| {
        Ok(Coordinate::new(row.get(0)?, row.get(1)?))
    })
    .optional()
    .map_err(Into::into)
}

fn write_record(conn: &mut Connection, key: &str, coordinate: Coordinate) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute(
        schema::UPSERT_LOCATION,
        params![key, coordinate.latitude, coordinate.longitude],
    )?;
    tx.commit()?;
    Ok(())
}

#[async_trait]
impl LocationEngine for SqliteEngine {
    async fn get(&self, key: &str) -> Result<Option<Coordinate>> {
        let key = key.to_string();
        self.with_conn(move |conn| read_record(conn, &key)).await
    }

    async fn put(&self, key: &str, coordinate: Coordinate) -> Result<()> {
        let key = key.to_string();
        self.with_conn(move |conn| write_record(conn, &key, coordinate)).await
    }
}

/// Opens a [`SqliteEngine`] at a configured path.
///
/// With no path configured the primary engine is considered absent.
#[derive(Debug, Clone, Default)]
pub struct SqliteConnector {
    path: Option<PathBuf>,
}

impl SqliteConnector {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }
}

#[async_trait]
impl EngineConnector for SqliteConnector {
    async fn connect(&self) -> Result<Arc<dyn LocationEngine>> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| Error::StorageUnavailable("no database path configured".to_string()))?;

        let engine = tokio::task::spawn_blocking(move || {
            crate::config::ensure_db_dir(&path)
                .map_err(|e| Error::StorageUnavailable(e.to_string()))?;
            SqliteEngine::open(&path)
        })
        .await?
        .map_err(|e| match e {
            Error::StorageUnavailable(_) => e,
            other => Error::StorageUnavailable(other.to_string()),
        })?;

        Ok(Arc::new(engine))
    }
}
