use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::StoreError;
use crate::schema;

/// Thread-safe SQLite connection wrapper.
/// Uses parking_lot::Mutex for synchronous access (rusqlite is not Sync).
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    /// Open or create a database at the given path, creating the parent
    /// directory if needed. Schema creation and migrations run on every open.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Io(format!("create dir {}: {e}", parent.display())))?;
        }

        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        initialize(&conn)?;

        info!(path = %path.display(), "database opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: path.to_owned(),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        initialize(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Execute a closure with the database connection.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release this handle. The connection is closed once the last clone
    /// is released; dropping a handle has the same effect.
    pub fn close(self) -> Result<(), StoreError> {
        let path = self.path;
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                mutex
                    .into_inner()
                    .close()
                    .map_err(|(_, e)| StoreError::Database(format!("close: {e}")))?;
                info!(path = %path.display(), "database closed");
                Ok(())
            }
            Err(_) => Ok(()),
        }
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            path: self.path.clone(),
        }
    }
}

fn initialize(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(schema::PRAGMAS)
        .map_err(|e| StoreError::Database(format!("pragmas: {e}")))?;

    conn.execute_batch(schema::CREATE_TABLES)
        .map_err(|e| StoreError::Database(format!("schema: {e}")))?;

    migrate(conn)?;

    let version: Option<u32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;

    match version {
        None => {
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [schema::SCHEMA_VERSION],
            )
            .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;
        }
        Some(v) if v < schema::SCHEMA_VERSION => {
            conn.execute("UPDATE schema_version SET version = ?1", [schema::SCHEMA_VERSION])
                .map_err(|e| StoreError::Database(format!("schema version: {e}")))?;
        }
        Some(_) => {}
    }

    Ok(())
}

/// Add any column from [`schema::ADDED_COLUMNS`] the table lacks. Returns
/// the columns added; empty unless the table came from an older build.
fn migrate(conn: &Connection) -> Result<Vec<&'static str>, StoreError> {
    let columns = table_columns(conn, "snapshots")?;
    let mut added = Vec::new();
    for (column, ddl) in schema::ADDED_COLUMNS {
        if !columns.iter().any(|c| c.as_str() == *column) {
            conn.execute_batch(ddl)
                .map_err(|e| StoreError::Database(format!("migrate {column}: {e}")))?;
            info!(column, "migrated legacy snapshots table");
            added.push(*column);
        }
    }
    Ok(added)
}

pub(crate) fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
