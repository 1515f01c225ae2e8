pub mod auth;
pub mod context;
pub mod errors;
pub mod settings;
pub mod tools;

pub use context::{continuation_prompt, SnapshotContext, StructuredContext};
pub use errors::ToolError;
