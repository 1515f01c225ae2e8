//! Method dispatch for the tool-call protocol.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use snapshot_core::auth::{AllowAll, AuthDecision, AuthorizationPolicy, CallContext};
use snapshot_core::settings::Settings;
use snapshot_core::tools::ToolResult;
use snapshot_core::ToolError;
use snapshot_store::Database;
use tracing::instrument;

use crate::registry::ToolRegistry;
use crate::rpc::{optional_str, require_str, RpcRequest, RpcResponse};
use crate::tools::register_snapshot_tools;

pub const SERVER_NAME: &str = "snapshot-server";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

/// Shared state for every request on a connection.
pub struct HandlerState {
    pub registry: ToolRegistry,
    pub policy: Arc<dyn AuthorizationPolicy>,
}

impl HandlerState {
    /// Snapshot tools over `db`, gated by [`AllowAll`].
    pub fn new(db: &Database, settings: &Settings) -> Self {
        let mut registry = ToolRegistry::new();
        register_snapshot_tools(&mut registry, db, settings.default_list_limit);
        Self {
            registry,
            policy: Arc::new(AllowAll),
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn AuthorizationPolicy>) -> Self {
        self.policy = policy;
        self
    }
}

/// Route one request. Notifications never get a response.
#[instrument(skip(state, req), fields(method = %req.method))]
pub async fn dispatch(state: &HandlerState, req: RpcRequest) -> Option<RpcResponse> {
    if req.is_notification() {
        tracing::debug!("notification received");
        return None;
    }
    let id = req.id.clone().unwrap_or_default();
    tracing::debug!("request received");

    let response = match req.method.as_str() {
        "initialize" => RpcResponse::success(id, initialize_result(req.params.as_ref())),
        "ping" => RpcResponse::success(id, json!({})),
        "tools/list" => match serde_json::to_value(state.registry.definitions()) {
            Ok(tools) => RpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => RpcResponse::internal_error(id, e.to_string()),
        },
        "tools/call" => {
            let Some(params) = req.params.as_ref() else {
                return Some(RpcResponse::invalid_params(id, "Missing params"));
            };
            let name = match require_str(params, "name") {
                Ok(name) => name,
                Err(msg) => return Some(RpcResponse::invalid_params(id, msg)),
            };
            let arguments = params
                .get("arguments")
                .filter(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(|| json!({}));

            let ctx = CallContext::new(name, arguments).with_headers(request_metadata(params));
            let result = call_tool(state, ctx).await;
            match serde_json::to_value(result) {
                Ok(value) => RpcResponse::success(id, value),
                Err(e) => RpcResponse::internal_error(id, e.to_string()),
            }
        }
        other => RpcResponse::method_not_found(id, other),
    };

    Some(response)
}

/// Authorize, look up and run a tool. Failures come back in-band.
pub async fn call_tool(state: &HandlerState, ctx: CallContext) -> ToolResult {
    match run_tool(state, &ctx).await {
        Ok(text) => ToolResult::text(text),
        Err(err) => {
            tracing::warn!(
                tool = %ctx.tool_name,
                kind = err.error_kind(),
                error = %err,
                "tool call failed"
            );
            ToolResult::error(&err)
        }
    }
}

async fn run_tool(state: &HandlerState, ctx: &CallContext) -> Result<String, ToolError> {
    let grant = match state.policy.authorize(ctx).await {
        AuthDecision::Allowed(grant) => grant,
        AuthDecision::Denied(denial) => return Err(denial.for_tool(&ctx.tool_name).into()),
    };
    tracing::debug!(
        policy = state.policy.name(),
        user = grant.user_id.as_deref(),
        "call authorized"
    );

    let tool = state
        .registry
        .get(&ctx.tool_name)
        .ok_or_else(|| ToolError::UnknownTool(ctx.tool_name.clone()))?;

    tool.call(ctx.arguments.clone()).await
}

/// String entries of the call's `_meta` object, handed to the policy as
/// request headers.
fn request_metadata(params: &Value) -> HashMap<String, String> {
    params
        .get("_meta")
        .and_then(Value::as_object)
        .map(|meta| {
            meta.iter()
                .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn initialize_result(params: Option<&Value>) -> Value {
    let protocol_version = params
        .and_then(|p| optional_str(p, "protocolVersion"))
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    json!({
        "protocolVersion": protocol_version,
        "capabilities": { "tools": {} },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }
    })
}
