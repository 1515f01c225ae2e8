use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::instrument;

use snapshot_core::context::{continuation_prompt, SnapshotContext};

use crate::database::Database;
use crate::error::StoreError;

pub use snapshot_core::settings::DEFAULT_LIST_LIMIT;

const SELECT_COLUMNS: &str =
    "SELECT id, name, summary, context, next_steps, continuation_prompt, created_at FROM snapshots";

/// A persisted snapshot row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub id: i64,
    pub name: Option<String>,
    pub summary: String,
    /// Flattened context text.
    pub context: String,
    pub next_steps: Option<String>,
    /// Empty for rows written before prompts were stored.
    pub continuation_prompt: String,
    pub created_at: String,
}

impl Snapshot {
    /// The prompt handed back on load: the stored one, or a freshly
    /// generated one for legacy rows.
    pub fn resolved_prompt(&self) -> String {
        if self.continuation_prompt.trim().is_empty() {
            self.derive_prompt()
        } else {
            self.continuation_prompt.clone()
        }
    }

    /// Regenerate the prompt from the stored fields.
    pub fn derive_prompt(&self) -> String {
        continuation_prompt(&self.summary, &self.context, self.next_steps.as_deref())
    }
}

/// Input to [`SnapshotRepo::create`].
#[derive(Clone, Debug)]
pub struct NewSnapshot {
    pub name: Option<String>,
    pub summary: String,
    pub context: SnapshotContext,
    pub next_steps: Option<String>,
}

impl NewSnapshot {
    pub fn new(summary: impl Into<String>, context: impl Into<SnapshotContext>) -> Self {
        Self {
            name: None,
            summary: summary.into(),
            context: context.into(),
            next_steps: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_next_steps(mut self, next_steps: impl Into<String>) -> Self {
        self.next_steps = Some(next_steps.into());
        self
    }
}

pub struct SnapshotRepo {
    db: Database,
}

impl SnapshotRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Format the context, generate the prompt and insert a new row.
    /// Returns the row as stored, including its id and timestamp.
    #[instrument(skip(self, input), fields(name = input.name.as_deref()))]
    pub fn create(&self, input: &NewSnapshot) -> Result<Snapshot, StoreError> {
        if input.summary.is_empty() {
            return Err(StoreError::Validation("summary is required".into()));
        }
        if input.context.is_empty() {
            return Err(StoreError::Validation("context is required".into()));
        }

        let context = input.context.flatten();
        let name = input.name.as_deref().filter(|n| !n.is_empty());
        let next_steps = input.next_steps.as_deref().filter(|n| !n.is_empty());
        let prompt = continuation_prompt(&input.summary, &context, next_steps);
        let created_at = timestamp_now();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO snapshots (name, summary, context, next_steps, continuation_prompt, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![name, input.summary, context, next_steps, prompt, created_at],
            )?;
            let id = conn.last_insert_rowid();
            fetch_by_id(conn, id)?
                .ok_or_else(|| StoreError::Database(format!("snapshot {id} missing after insert")))
        })
    }

    /// Get a snapshot by id. `None` when no row matches.
    #[instrument(skip(self))]
    pub fn get(&self, id: i64) -> Result<Option<Snapshot>, StoreError> {
        self.db.with_conn(|conn| fetch_by_id(conn, id))
    }

    /// Most recent snapshot carrying `name`.
    #[instrument(skip(self))]
    pub fn get_by_name(&self, name: &str) -> Result<Option<Snapshot>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "{SELECT_COLUMNS} WHERE name = ?1 ORDER BY created_at DESC, id DESC LIMIT 1"
            );
            Ok(conn.query_row(&sql, [name], row_to_snapshot).optional()?)
        })
    }

    /// Most recent snapshot overall.
    #[instrument(skip(self))]
    pub fn latest(&self) -> Result<Option<Snapshot>, StoreError> {
        self.db.with_conn(|conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT 1");
            Ok(conn.query_row(&sql, [], row_to_snapshot).optional()?)
        })
    }

    /// Newest first. A missing or zero limit means [`DEFAULT_LIST_LIMIT`].
    #[instrument(skip(self))]
    pub fn list(&self, limit: Option<u32>) -> Result<Vec<Snapshot>, StoreError> {
        let limit = limit.filter(|n| *n > 0).unwrap_or(DEFAULT_LIST_LIMIT);
        self.db.with_conn(|conn| {
            let sql = format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC LIMIT ?1");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], row_to_snapshot)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Delete by id. Returns whether a row was removed.
    #[instrument(skip(self))]
    pub fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.db.with_conn(|conn| {
            let rows = conn.execute("DELETE FROM snapshots WHERE id = ?1", [id])?;
            Ok(rows > 0)
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row("SELECT COUNT(*) FROM snapshots", [], |row| row.get(0))?)
        })
    }
}

/// Same shape as SQLite's `datetime('now')`, so rows written by either sort together.
fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn fetch_by_id(conn: &Connection, id: i64) -> Result<Option<Snapshot>, StoreError> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], row_to_snapshot).optional()?)
}

fn row_to_snapshot(row: &Row<'_>) -> rusqlite::Result<Snapshot> {
    Ok(Snapshot {
        id: row.get(0)?,
        name: row.get(1)?,
        summary: row.get(2)?,
        context: row.get(3)?,
        next_steps: row.get(4)?,
        continuation_prompt: row.get(5)?,
        created_at: row.get(6)?,
    })
}
