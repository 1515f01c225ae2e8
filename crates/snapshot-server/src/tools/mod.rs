mod delete;
mod list;
mod load;
mod save;

pub use delete::DeleteSnapshotTool;
pub use list::ListSnapshotsTool;
pub use load::LoadSnapshotTool;
pub use save::SaveSnapshotTool;

use std::sync::Arc;

use serde_json::Value;
use snapshot_core::ToolError;
use snapshot_store::Database;

use crate::registry::ToolRegistry;

/// Register the four snapshot tools in their advertised order.
pub fn register_snapshot_tools(registry: &mut ToolRegistry, db: &Database, default_list_limit: u32) {
    registry.register(Arc::new(SaveSnapshotTool::new(db.clone())));
    registry.register(Arc::new(LoadSnapshotTool::new(db.clone())));
    registry.register(Arc::new(ListSnapshotsTool::new(db.clone(), default_list_limit)));
    registry.register(Arc::new(DeleteSnapshotTool::new(db.clone())));
}

/// Read an integer id argument. Absent and `null` are `None`; anything
/// other than an integer is a validation error.
pub(crate) fn id_arg(args: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| ToolError::validation("Invalid snapshot ID", format!("{key} must be an integer"))),
    }
}

/// Read a string argument, treating empty strings as absent.
pub(crate) fn non_empty_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}
