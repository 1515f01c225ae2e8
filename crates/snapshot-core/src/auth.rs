//! Authorization gate consulted before every tool call.
//!
//! The server only depends on [`AuthorizationPolicy`]; the default
//! [`AllowAll`] keeps local desktop use credential-free.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::ToolError;

/// Everything a policy may inspect about a pending call.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
    pub tool_name: String,
    /// String entries of the request's `_meta`, e.g. an `authorization` token.
    pub headers: HashMap<String, String>,
    pub arguments: serde_json::Value,
}

impl CallContext {
    pub fn new(tool_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            headers: HashMap::new(),
            arguments,
        }
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Identity attached to an allowed call. Empty for local use.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grant {
    pub user_id: Option<String>,
    pub scopes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthDenial {
    /// Machine-readable code, e.g. `missing_token` or `insufficient_scope`.
    pub error: String,
    pub description: String,
    pub required_scope: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthDecision {
    Allowed(Grant),
    Denied(AuthDenial),
}

impl AuthDenial {
    /// Fill in the scope `tool_name` needs when the policy left it unset.
    pub fn for_tool(mut self, tool_name: &str) -> Self {
        if self.required_scope.is_none() {
            self.required_scope = Some(required_scope(tool_name).to_string());
        }
        self
    }
}

impl From<AuthDenial> for ToolError {
    fn from(denial: AuthDenial) -> Self {
        ToolError::Unauthorized {
            code: denial.error,
            description: denial.description,
            required_scope: denial.required_scope,
        }
    }
}

#[async_trait]
pub trait AuthorizationPolicy: Send + Sync {
    fn name(&self) -> &str;
    async fn authorize(&self, ctx: &CallContext) -> AuthDecision;
}

/// Allows every call without looking at credentials.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

#[async_trait]
impl AuthorizationPolicy for AllowAll {
    fn name(&self) -> &str {
        "allow_all"
    }

    async fn authorize(&self, _ctx: &CallContext) -> AuthDecision {
        AuthDecision::Allowed(Grant::default())
    }
}

pub const SCOPE_READ: &str = "snapshot:read";
pub const SCOPE_WRITE: &str = "snapshot:write";
pub const SCOPE_DELETE: &str = "snapshot:delete";

/// Scope a token would need to call `tool_name`. Unknown tools need read.
pub fn required_scope(tool_name: &str) -> &'static str {
    match tool_name {
        "save_snapshot" => SCOPE_WRITE,
        "load_snapshot" | "list_snapshots" => SCOPE_READ,
        "delete_snapshot" => SCOPE_DELETE,
        _ => SCOPE_READ,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RequireHeader;

    #[async_trait]
    impl AuthorizationPolicy for RequireHeader {
        fn name(&self) -> &str {
            "require_header"
        }

        async fn authorize(&self, ctx: &CallContext) -> AuthDecision {
            if ctx.headers.contains_key("authorization") {
                AuthDecision::Allowed(Grant {
                    user_id: Some("user-1".into()),
                    scopes: vec![SCOPE_READ.into()],
                })
            } else {
                AuthDecision::Denied(AuthDenial {
                    error: "missing_token".into(),
                    description: "Authorization header is required".into(),
                    required_scope: Some(required_scope(&ctx.tool_name).into()),
                })
            }
        }
    }

    #[tokio::test]
    async fn allow_all_allows_everything() {
        let ctx = CallContext::new("delete_snapshot", serde_json::json!({"id": 1}));
        let decision = AllowAll.authorize(&ctx).await;
        assert_eq!(decision, AuthDecision::Allowed(Grant::default()));
    }

    #[tokio::test]
    async fn denial_becomes_unauthorized_error() {
        let ctx = CallContext::new("save_snapshot", serde_json::json!({}));
        let AuthDecision::Denied(denial) = RequireHeader.authorize(&ctx).await else {
            panic!("expected denial");
        };
        let err = ToolError::from(denial);
        assert_eq!(err.error_kind(), "missing_token");
        assert_eq!(err.details().as_deref(), Some("Required scope: snapshot:write"));
    }

    #[tokio::test]
    async fn second_policy_allows_with_header() {
        let headers = HashMap::from([("authorization".to_string(), "Bearer t".to_string())]);
        let ctx = CallContext::new("load_snapshot", serde_json::json!({})).with_headers(headers);
        let AuthDecision::Allowed(grant) = RequireHeader.authorize(&ctx).await else {
            panic!("expected grant");
        };
        assert_eq!(grant.user_id.as_deref(), Some("user-1"));
    }

    #[test]
    fn denial_scope_filled_from_tool() {
        let denial = AuthDenial {
            error: "insufficient_scope".into(),
            description: "nope".into(),
            required_scope: None,
        };
        assert_eq!(
            denial.clone().for_tool("delete_snapshot").required_scope.as_deref(),
            Some(SCOPE_DELETE)
        );

        let explicit = AuthDenial {
            required_scope: Some("admin".into()),
            ..denial
        };
        assert_eq!(explicit.for_tool("delete_snapshot").required_scope.as_deref(), Some("admin"));
    }

    #[test]
    fn scope_mapping() {
        assert_eq!(required_scope("save_snapshot"), "snapshot:write");
        assert_eq!(required_scope("load_snapshot"), "snapshot:read");
        assert_eq!(required_scope("list_snapshots"), "snapshot:read");
        assert_eq!(required_scope("delete_snapshot"), "snapshot:delete");
        assert_eq!(required_scope("anything_else"), "snapshot:read");
    }
}
