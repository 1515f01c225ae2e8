use async_trait::async_trait;
use serde_json::Value;
use snapshot_core::tools::Tool;
use snapshot_core::ToolError;
use snapshot_store::{Database, Snapshot, SnapshotRepo};

pub struct ListSnapshotsTool {
    repo: SnapshotRepo,
    default_limit: u32,
}

impl ListSnapshotsTool {
    pub fn new(db: Database, default_limit: u32) -> Self {
        Self {
            repo: SnapshotRepo::new(db),
            default_limit,
        }
    }

    /// Caller limit when it is a positive integer, otherwise the default.
    fn effective_limit(&self, args: &Value) -> u32 {
        args.get("limit")
            .and_then(Value::as_i64)
            .filter(|n| *n > 0)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(self.default_limit)
    }
}

fn list_line(snapshot: &Snapshot) -> String {
    let name_part = snapshot
        .name
        .as_deref()
        .map(|n| format!(" ({n})"))
        .unwrap_or_default();
    format!(
        "#{}{} - {} [{}]",
        snapshot.id, name_part, snapshot.summary, snapshot.created_at
    )
}

#[async_trait]
impl Tool for ListSnapshotsTool {
    fn name(&self) -> &str {
        "list_snapshots"
    }

    fn description(&self) -> &str {
        "List all snapshots"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "number",
                    "description": "Max snapshots (default: 100)"
                }
            }
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let limit = self.effective_limit(&args);
        let snapshots = self
            .repo
            .list(Some(limit))
            .map_err(|e| ToolError::storage("Failed to list snapshots", e))?;

        if snapshots.is_empty() {
            return Ok("No snapshots found.".to_string());
        }

        Ok(snapshots.iter().map(list_line).collect::<Vec<_>>().join("\n"))
    }
}
