use async_trait::async_trait;
use serde_json::Value;
use snapshot_core::tools::Tool;
use snapshot_core::ToolError;
use snapshot_store::{Database, SnapshotRepo};

use super::id_arg;

pub struct DeleteSnapshotTool {
    repo: SnapshotRepo,
}

impl DeleteSnapshotTool {
    pub fn new(db: Database) -> Self {
        Self {
            repo: SnapshotRepo::new(db),
        }
    }
}

#[async_trait]
impl Tool for DeleteSnapshotTool {
    fn name(&self) -> &str {
        "delete_snapshot"
    }

    fn description(&self) -> &str {
        "Delete snapshot by ID"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "number",
                    "description": "Snapshot ID"
                }
            },
            "required": ["id"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let Some(id) = id_arg(&args, "id")? else {
            return Err(ToolError::validation("Missing required field", "id is required"));
        };

        let deleted = self
            .repo
            .delete(id)
            .map_err(|e| ToolError::storage("Failed to delete snapshot", e))?;

        if !deleted {
            return Err(ToolError::not_found(format!("Snapshot with ID {id} not found")));
        }

        tracing::info!(id, "snapshot deleted");
        Ok(format!("Deleted snapshot #{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use snapshot_store::NewSnapshot;

    #[tokio::test]
    async fn deletes_by_id() {
        let db = Database::in_memory().unwrap();
        let repo = SnapshotRepo::new(db.clone());
        let snap = repo.create(&NewSnapshot::new("To delete", "c")).unwrap();

        let tool = DeleteSnapshotTool::new(db);
        let text = tool.call(json!({"id": snap.id})).await.unwrap();
        assert_eq!(text, format!("Deleted snapshot #{}", snap.id));
        assert_eq!(repo.get(snap.id).unwrap(), None);
    }

    #[tokio::test]
    async fn missing_id_is_not_found() {
        let tool = DeleteSnapshotTool::new(Database::in_memory().unwrap());
        let err = tool.call(json!({"id": 99999})).await.unwrap_err();
        assert_eq!(err.error_kind(), "not_found");
        assert_eq!(err.to_string(), "Snapshot with ID 99999 not found");
    }

    #[tokio::test]
    async fn requires_id() {
        let tool = DeleteSnapshotTool::new(Database::in_memory().unwrap());
        let err = tool.call(json!({})).await.unwrap_err();
        assert_eq!(err.error_kind(), "validation_error");
        assert!(err.render().contains("id is required"));
    }
}
