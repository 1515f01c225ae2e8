//! Context normalization and continuation-prompt generation.
//!
//! A snapshot's context arrives either as free text or as a structured
//! object. It is resolved once into [`SnapshotContext`] and flattened into
//! the single text block that is persisted. The prompt generator is shared
//! by the save path and by the load path for rows that predate stored
//! prompts, so both always produce the same text.

use serde::Deserialize;
use serde_json::{Map, Value};

const KNOWN_KEYS: [&str; 4] = ["files", "decisions", "blockers", "code_state"];

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("context must be a string or an object, got {0}")]
    UnsupportedType(&'static str),
    #[error("invalid structured context: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// Context as submitted by the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum SnapshotContext {
    Text(String),
    Structured(StructuredContext),
}

/// Object form of a context. Unknown keys are kept in `extra` in the order
/// they were received.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct StructuredContext {
    #[serde(default)]
    pub files: Option<Vec<String>>,
    #[serde(default)]
    pub decisions: Option<Vec<String>>,
    #[serde(default)]
    pub blockers: Option<Vec<String>>,
    #[serde(default)]
    pub code_state: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SnapshotContext {
    /// Resolve a raw JSON argument into a context.
    pub fn from_value(value: Value) -> Result<Self, ContextError> {
        match value {
            Value::String(text) => Ok(Self::Text(text)),
            Value::Object(_) => Ok(Self::Structured(serde_json::from_value(value)?)),
            Value::Null => Err(ContextError::UnsupportedType("null")),
            Value::Bool(_) => Err(ContextError::UnsupportedType("boolean")),
            Value::Number(_) => Err(ContextError::UnsupportedType("number")),
            Value::Array(_) => Err(ContextError::UnsupportedType("array")),
        }
    }

    /// The persisted text form. Plain text passes through untouched.
    pub fn flatten(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(structured) => structured.flatten(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Structured(structured) => structured.flatten().is_empty(),
        }
    }
}

impl From<String> for SnapshotContext {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for SnapshotContext {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<StructuredContext> for SnapshotContext {
    fn from(structured: StructuredContext) -> Self {
        Self::Structured(structured)
    }
}

impl StructuredContext {
    pub fn flatten(&self) -> String {
        let mut lines: Vec<String> = Vec::new();

        push_list(&mut lines, "Files:", self.files.as_deref());
        push_list(&mut lines, "Decisions:", self.decisions.as_deref());
        push_list(&mut lines, "Blockers:", self.blockers.as_deref());

        if let Some(code_state) = self.code_state.as_ref().filter(|m| !m.is_empty()) {
            lines.push("Code State:".to_string());
            lines.push(format!("{:#}", Value::Object(code_state.clone())));
            lines.push(String::new());
        }

        for (key, value) in &self.extra {
            // Sections above own these keys
            if KNOWN_KEYS.contains(&key.as_str()) {
                continue;
            }
            lines.push(format!("{key}:"));
            match value {
                Value::String(text) => lines.push(text.clone()),
                other => lines.push(format!("{other:#}")),
            }
            lines.push(String::new());
        }

        lines.join("\n").trim().to_string()
    }
}

fn push_list(lines: &mut Vec<String>, header: &str, items: Option<&[String]>) {
    let Some(items) = items.filter(|items| !items.is_empty()) else {
        return;
    };
    lines.push(header.to_string());
    lines.extend(items.iter().map(|item| format!("- {item}")));
    lines.push(String::new());
}

/// Build the text handed back when a snapshot is loaded.
pub fn continuation_prompt(summary: &str, context: &str, next_steps: Option<&str>) -> String {
    let mut parts = vec![
        format!("Resuming: {summary}"),
        String::new(),
        "Context:".to_string(),
        context.to_string(),
    ];

    if let Some(next) = next_steps.filter(|n| !n.is_empty()) {
        parts.push(String::new());
        parts.push("Next:".to_string());
        parts.push(next.to_string());
    }

    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn structured(value: Value) -> SnapshotContext {
        SnapshotContext::from_value(value).unwrap()
    }

    #[test]
    fn text_passes_through() {
        let ctx = structured(json!("  raw text\nwith lines  "));
        assert_eq!(ctx.flatten(), "  raw text\nwith lines  ");
    }

    #[test]
    fn files_section_in_source_order() {
        let ctx = structured(json!({"files": ["b.rs", "a.rs", "c.rs"]}));
        assert_eq!(ctx.flatten(), "Files:\n- b.rs\n- a.rs\n- c.rs");
    }

    #[test]
    fn sections_in_fixed_order() {
        let ctx = structured(json!({
            "blockers": ["CI is red"],
            "decisions": ["use SQLite"],
            "files": ["a.ts"],
        }));
        assert_eq!(
            ctx.flatten(),
            "Files:\n- a.ts\n\nDecisions:\n- use SQLite\n\nBlockers:\n- CI is red"
        );
    }

    #[test]
    fn empty_sections_are_omitted() {
        let ctx = structured(json!({
            "files": [],
            "decisions": null,
            "blockers": ["waiting on review"],
            "code_state": {},
        }));
        assert_eq!(ctx.flatten(), "Blockers:\n- waiting on review");
    }

    #[test]
    fn code_state_pretty_printed() {
        let ctx = structured(json!({"code_state": {"branch": "main", "dirty": true}}));
        assert_eq!(
            ctx.flatten(),
            "Code State:\n{\n  \"branch\": \"main\",\n  \"dirty\": true\n}"
        );
    }

    #[test]
    fn extra_keys_keep_insertion_order() {
        let ctx = structured(json!({
            "zeta": "last letter",
            "alpha": {"n": 1},
            "files": ["x.rs"],
        }));
        assert_eq!(
            ctx.flatten(),
            "Files:\n- x.rs\n\nzeta:\nlast letter\n\nalpha:\n{\n  \"n\": 1\n}"
        );
    }

    #[test]
    fn empty_object_flattens_to_empty() {
        let ctx = structured(json!({}));
        assert!(ctx.is_empty());
        assert_eq!(ctx.flatten(), "");
    }

    #[test]
    fn rejects_non_string_non_object() {
        assert!(matches!(
            SnapshotContext::from_value(json!(42)),
            Err(ContextError::UnsupportedType("number"))
        ));
        assert!(matches!(
            SnapshotContext::from_value(json!(["a"])),
            Err(ContextError::UnsupportedType("array"))
        ));
    }

    #[test]
    fn rejects_non_string_list_entries() {
        let result = SnapshotContext::from_value(json!({"files": [1, 2]}));
        assert!(matches!(result, Err(ContextError::Invalid(_))));
    }

    #[test]
    fn prompt_without_next_steps() {
        let prompt = continuation_prompt("Built the parser", "Files:\n- parser.rs", None);
        assert_eq!(prompt, "Resuming: Built the parser\n\nContext:\nFiles:\n- parser.rs");
        assert!(!prompt.contains("Next:"));
    }

    #[test]
    fn prompt_with_next_steps() {
        let prompt = continuation_prompt("s", "c", Some("write tests"));
        assert_eq!(prompt, "Resuming: s\n\nContext:\nc\n\nNext:\nwrite tests");
    }

    #[test]
    fn empty_next_steps_adds_nothing() {
        assert_eq!(
            continuation_prompt("s", "c", Some("")),
            continuation_prompt("s", "c", None)
        );
    }
}
