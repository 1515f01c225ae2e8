/// SQL DDL for the snapshot database.
/// WAL mode + full synchronous flushing applied at connection time.
pub const SCHEMA_VERSION: u32 = 2;

/// Current table shape. Tables created by older builds lack the columns in
/// [`ADDED_COLUMNS`] and get them on open.
pub const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    summary TEXT NOT NULL,
    context TEXT NOT NULL,
    next_steps TEXT,
    continuation_prompt TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_snapshots_created_at
    ON snapshots(created_at DESC);

CREATE INDEX IF NOT EXISTS idx_snapshots_name
    ON snapshots(name) WHERE name IS NOT NULL;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);
"#;

/// Additive migrations for legacy tables: (column, DDL). Applied when the
/// column is missing.
pub const ADDED_COLUMNS: &[(&str, &str)] = &[(
    "continuation_prompt",
    "ALTER TABLE snapshots ADD COLUMN continuation_prompt TEXT NOT NULL DEFAULT ''",
)];

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;
PRAGMA busy_timeout = 5000;
"#;
