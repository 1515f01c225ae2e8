/// Typed error for tool calls. Every failure reaching the dispatch boundary
/// is one of these, so the boundary can render kind, message and details
/// without inspecting the underlying cause.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    // Caller mistakes, never retried
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },
    #[error("{message}")]
    NotFound {
        message: String,
        details: Option<String>,
    },
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    // Denied by the authorization gate
    #[error("{description}")]
    Unauthorized {
        code: String,
        description: String,
        required_scope: Option<String>,
    },

    // Operational
    #[error("{message}")]
    Storage {
        message: String,
        details: Option<String>,
    },
}

impl ToolError {
    pub fn validation(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
            details: None,
        }
    }

    pub fn storage(message: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::Storage {
            message: message.into(),
            details: Some(cause.to_string()),
        }
    }

    /// Stable kind identifier shown to clients.
    pub fn error_kind(&self) -> &str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::NotFound { .. } => "not_found",
            Self::UnknownTool(_) => "unknown_tool",
            Self::Unauthorized { code, .. } => code,
            Self::Storage { .. } => "database_error",
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            Self::Validation { details, .. }
            | Self::NotFound { details, .. }
            | Self::Storage { details, .. } => details.clone(),
            Self::Unauthorized { required_scope, .. } => required_scope
                .as_ref()
                .map(|scope| format!("Required scope: {scope}")),
            Self::UnknownTool(_) => None,
        }
    }

    /// Multi-line text shown to the client in place of a tool result.
    pub fn render(&self) -> String {
        let mut parts = vec![format!("Error: {self}")];
        if let Some(details) = self.details() {
            parts.push(format!("Details: {details}"));
        }
        parts.push(format!("Code: {}", self.error_kind()));
        parts.join("\n")
    }
}
