use async_trait::async_trait;
use serde_json::Value;
use snapshot_core::context::SnapshotContext;
use snapshot_core::tools::Tool;
use snapshot_core::ToolError;
use snapshot_store::{Database, NewSnapshot, SnapshotRepo, StoreError};

use super::non_empty_str;

const MISSING_FIELDS: &str = "Missing required fields";

pub struct SaveSnapshotTool {
    repo: SnapshotRepo,
}

impl SaveSnapshotTool {
    pub fn new(db: Database) -> Self {
        Self {
            repo: SnapshotRepo::new(db),
        }
    }
}

#[async_trait]
impl Tool for SaveSnapshotTool {
    fn name(&self) -> &str {
        "save_snapshot"
    }

    fn description(&self) -> &str {
        "Save current conversation state"
    }

    fn input_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "Summary of work accomplished"
                },
                "context": {
                    "oneOf": [
                        {
                            "type": "string",
                            "description": "Conversation context and state"
                        },
                        {
                            "type": "object",
                            "description": "Structured context",
                            "properties": {
                                "files": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Files modified"
                                },
                                "decisions": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Decisions made"
                                },
                                "blockers": {
                                    "type": "array",
                                    "items": { "type": "string" },
                                    "description": "Blockers"
                                },
                                "code_state": {
                                    "type": "object",
                                    "description": "Code state"
                                }
                            }
                        }
                    ]
                },
                "name": {
                    "type": "string",
                    "description": "Optional name"
                },
                "next_steps": {
                    "type": "string",
                    "description": "Next steps"
                }
            },
            "required": ["summary", "context"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let summary = non_empty_str(&args, "summary");
        let context = args
            .get("context")
            .filter(|v| !v.is_null() && v.as_str() != Some(""));

        let (Some(summary), Some(context)) = (summary, context) else {
            return Err(ToolError::validation(
                MISSING_FIELDS,
                "Both summary and context are required",
            ));
        };

        let context = SnapshotContext::from_value(context.clone())
            .map_err(|e| ToolError::validation("Invalid context", e.to_string()))?;

        let input = NewSnapshot {
            name: non_empty_str(&args, "name").map(String::from),
            summary: summary.to_string(),
            context,
            next_steps: non_empty_str(&args, "next_steps").map(String::from),
        };

        let snapshot = self.repo.create(&input).map_err(|e| match e {
            StoreError::Validation(msg) => ToolError::validation(MISSING_FIELDS, msg),
            other => ToolError::storage("Failed to save snapshot", other),
        })?;

        tracing::info!(id = snapshot.id, name = snapshot.name.as_deref(), "snapshot saved");

        Ok(match &snapshot.name {
            Some(name) => format!("Saved snapshot #{} ({name})", snapshot.id),
            None => format!("Saved snapshot #{}", snapshot.id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool() -> (SaveSnapshotTool, SnapshotRepo) {
        let db = Database::in_memory().unwrap();
        (SaveSnapshotTool::new(db.clone()), SnapshotRepo::new(db))
    }

    #[tokio::test]
    async fn saves_string_context() {
        let (tool, repo) = tool();
        let text = tool
            .call(json!({"summary": "Test save", "context": "String context"}))
            .await
            .unwrap();
        assert!(text.starts_with("Saved snapshot #"));
        let snap = repo.latest().unwrap().unwrap();
        assert_eq!(text, format!("Saved snapshot #{}", snap.id));
        assert_eq!(snap.context, "String context");
    }

    #[tokio::test]
    async fn saves_structured_context_flattened() {
        let (tool, repo) = tool();
        tool.call(json!({
            "summary": "Structured save",
            "context": {"files": ["test.ts"], "decisions": ["Use Vitest"]}
        }))
        .await
        .unwrap();
        let snap = repo.latest().unwrap().unwrap();
        assert_eq!(snap.context, "Files:\n- test.ts\n\nDecisions:\n- Use Vitest");
    }

    #[tokio::test]
    async fn named_save_mentions_name() {
        let (tool, _) = tool();
        let text = tool
            .call(json!({"name": "test-milestone", "summary": "Named save", "context": "Context"}))
            .await
            .unwrap();
        assert!(text.ends_with("(test-milestone)"));
    }

    #[tokio::test]
    async fn missing_summary_or_context_is_validation_error() {
        let (tool, repo) = tool();
        for args in [
            json!({"context": "Context only"}),
            json!({"summary": "Summary only"}),
            json!({"summary": "", "context": "c"}),
            json!({"summary": "s", "context": ""}),
            json!({"summary": "s", "context": null}),
        ] {
            let err = tool.call(args).await.unwrap_err();
            assert_eq!(err.error_kind(), "validation_error");
            let rendered = err.render();
            assert!(rendered.contains("Missing required fields"));
            assert!(rendered.contains("Both summary and context are required"));
        }
        assert_eq!(repo.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn empty_structured_context_is_rejected() {
        let (tool, _) = tool();
        let err = tool
            .call(json!({"summary": "s", "context": {"files": []}}))
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "validation_error");
        assert_eq!(err.details().as_deref(), Some("context is required"));
    }

    #[tokio::test]
    async fn unsupported_context_type_is_rejected() {
        let (tool, _) = tool();
        let err = tool.call(json!({"summary": "s", "context": 42})).await.unwrap_err();
        assert_eq!(err.error_kind(), "validation_error");
        assert!(err.render().contains("Invalid context"));
    }
}
