use async_trait::async_trait;
use serde_json::Value;
use snapshot_core::tools::Tool;
use snapshot_core::ToolError;
use snapshot_store::{Database, SnapshotRepo, StoreError};

use super::{id_arg, non_empty_str};

pub struct LoadSnapshotTool {
    repo: SnapshotRepo,
}

impl LoadSnapshotTool {
    pub fn new(db: Database) -> Self {
        Self {
            repo: SnapshotRepo::new(db),
        }
    }
}

fn load_failed(e: StoreError) -> ToolError {
    ToolError::storage("Failed to load snapshot", e)
}

#[async_trait]
impl Tool for LoadSnapshotTool {
    fn name(&self) -> &str {
        "load_snapshot"
    }

    fn description(&self) -> &str {
        "Load snapshot by ID, name, or latest"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "number",
                    "description": "Snapshot ID"
                },
                "name": {
                    "type": "string",
                    "description": "Snapshot name"
                }
            }
        })
    }

    /// Lookup precedence: `id`, then `name`, then the latest snapshot.
    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let snapshot = if let Some(id) = id_arg(&args, "id")? {
            self.repo
                .get(id)
                .map_err(load_failed)?
                .ok_or_else(|| ToolError::not_found(format!("Snapshot with ID {id} not found")))?
        } else if let Some(name) = non_empty_str(&args, "name") {
            self.repo
                .get_by_name(name)
                .map_err(load_failed)?
                .ok_or_else(|| {
                    ToolError::not_found(format!("Snapshot with name \"{name}\" not found"))
                })?
        } else {
            self.repo
                .latest()
                .map_err(load_failed)?
                .ok_or_else(|| ToolError::NotFound {
                    message: "No snapshots found".into(),
                    details: Some("Database is empty".into()),
                })?
        };

        tracing::debug!(id = snapshot.id, "snapshot loaded");
        Ok(snapshot.resolved_prompt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snapshot_store::NewSnapshot;

    fn setup() -> (LoadSnapshotTool, SnapshotRepo, Database) {
        let db = Database::in_memory().unwrap();
        (LoadSnapshotTool::new(db.clone()), SnapshotRepo::new(db.clone()), db)
    }

    #[tokio::test]
    async fn loads_by_id() {
        let (tool, repo, _) = setup();
        let snap = repo
            .create(&NewSnapshot::new("Test for loading", "Load test context"))
            .unwrap();
        let text = tool.call(json!({"id": snap.id})).await.unwrap();
        assert!(text.contains("Resuming: Test for loading"));
        assert!(text.contains("Load test context"));
    }

    #[tokio::test]
    async fn loads_by_name() {
        let (tool, repo, _) = setup();
        repo.create(&NewSnapshot::new("Named snapshot", "c").with_name("load-by-name"))
            .unwrap();
        let text = tool.call(json!({"name": "load-by-name"})).await.unwrap();
        assert!(text.contains("Resuming: Named snapshot"));
    }

    #[tokio::test]
    async fn id_takes_precedence_over_name() {
        let (tool, repo, _) = setup();
        let first = repo.create(&NewSnapshot::new("By id", "c")).unwrap();
        repo.create(&NewSnapshot::new("By name", "c").with_name("n")).unwrap();
        let text = tool.call(json!({"id": first.id, "name": "n"})).await.unwrap();
        assert!(text.starts_with("Resuming: By id"));
    }

    #[tokio::test]
    async fn loads_latest_without_params() {
        let (tool, repo, _) = setup();
        repo.create(&NewSnapshot::new("First", "Context 1")).unwrap();
        repo.create(&NewSnapshot::new("Latest", "Context 2")).unwrap();
        let text = tool.call(json!({})).await.unwrap();
        assert!(text.contains("Resuming: Latest"));
    }

    #[tokio::test]
    async fn includes_next_steps() {
        let (tool, repo, _) = setup();
        repo.create(
            &NewSnapshot::new("With next steps", "Some context")
                .with_next_steps("Complete testing phase"),
        )
        .unwrap();
        let text = tool.call(json!({})).await.unwrap();
        assert!(text.contains("Next:"));
        assert!(text.contains("Complete testing phase"));
    }

    #[tokio::test]
    async fn not_found_cases() {
        let (tool, _, _) = setup();

        let err = tool.call(json!({"id": 99999})).await.unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert_eq!(err.to_string(), "Snapshot with ID 99999 not found");

        let err = tool.call(json!({"name": "non-existent"})).await.unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert!(err.to_string().contains("not found"));

        let err = tool.call(json!({})).await.unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert!(err.render().contains("No snapshots found"));
        assert!(err.render().contains("Database is empty"));
    }

    #[tokio::test]
    async fn legacy_row_prompt_derived_on_load() {
        let (tool, _, db) = setup();
        let id = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO snapshots (summary, context, next_steps, continuation_prompt)
                     VALUES ('Old', 'old ctx', 'resume', '')",
                    [],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();
        let text = tool.call(json!({"id": id})).await.unwrap();
        assert_eq!(text, "Resuming: Old\n\nContext:\nold ctx\n\nNext:\nresume");
    }

    #[tokio::test]
    async fn rejects_non_integer_id() {
        let (tool, _, _) = setup();
        let err = tool.call(json!({"id": "abc"})).await.unwrap_err();
        assert_eq!(err.error_kind(), "validation_error");
    }
}
