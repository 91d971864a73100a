//! Downstream JSON-RPC dispatch.
//!
//! Validates one inbound message, maps its method onto the fixed set the
//! gateway serves, and turns the outcome into a response envelope.

use serde::Serialize;
use serde_json::{json, Value};

use crate::mcp_client::types::{
    CallToolParams, Implementation, JsonRpcResponse, RequestId, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use crate::mcp_client::{CallToolResult, McpError, Tool};

use super::router::ToolRouter;

// ─── McpMethod ───────────────────────────────────────────────────────────────

/// Methods the gateway answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Initialized,
    ListTools,
    CallTool,
}

impl McpMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(McpMethod::Initialize),
            "notifications/initialized" | "initialized" => Some(McpMethod::Initialized),
            "tools/list" => Some(McpMethod::ListTools),
            "tools/call" => Some(McpMethod::CallTool),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            McpMethod::Initialize => "initialize",
            McpMethod::Initialized => "notifications/initialized",
            McpMethod::ListTools => "tools/list",
            McpMethod::CallTool => "tools/call",
        }
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServerInitializeResult {
    protocol_version: &'static str,
    capabilities: Value,
    server_info: Implementation,
}

#[derive(Serialize)]
struct ToolList {
    tools: Vec<Tool>,
}

/// Run one method. `Ok(None)` means the method produces no result.
pub async fn dispatch(
    router: &mut ToolRouter,
    method: McpMethod,
    params: Value,
) -> Result<Option<Value>, McpError> {
    match method {
        McpMethod::Initialize => to_result(ServerInitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: json!({ "tools": {} }),
            server_info: Implementation::gateway(),
        }),
        McpMethod::Initialized => Ok(None),
        McpMethod::ListTools => to_result(ToolList {
            tools: router.list_tools().await,
        }),
        McpMethod::CallTool => {
            let params: CallToolParams =
                serde_json::from_value(params).map_err(|e| McpError::InvalidParams {
                    method: method.as_str().into(),
                    reason: e.to_string(),
                })?;
            let arguments = if params.arguments.is_null() {
                json!({})
            } else {
                params.arguments
            };

            match router.call_tool(&params.name, arguments).await {
                Ok(Some(result)) => to_result(result),
                Ok(None) => Err(McpError::UnknownTool { name: params.name }),
                Err(e @ McpError::InvalidParams { .. }) => Err(e),
                Err(e) => {
                    tracing::warn!(
                        tool = %params.name,
                        kind = e.kind(),
                        error = %e,
                        "tool call failed"
                    );
                    to_result(CallToolResult::error(format!(
                        "Tool '{}' failed: {e}",
                        params.name
                    )))
                }
            }
        }
    }
}

fn to_result<T: Serialize>(value: T) -> Result<Option<Value>, McpError> {
    serde_json::to_value(value)
        .map(Some)
        .map_err(|e| McpError::Internal {
            reason: format!("failed to encode result: {e}"),
        })
}

// ─── Envelope Handling ───────────────────────────────────────────────────────

/// Handle one decoded JSON body.
///
/// Returns `None` for notifications, which get no response.
pub async fn handle_message(router: &mut ToolRouter, body: Value) -> Option<JsonRpcResponse> {
    let Some(message) = body.as_object() else {
        return Some(invalid_request(None, "message must be a JSON object"));
    };

    let id = match message.get("id") {
        None | Some(Value::Null) => None,
        Some(raw) => match serde_json::from_value::<RequestId>(raw.clone()) {
            Ok(id) => Some(id),
            Err(_) => return Some(invalid_request(None, "id must be a string or number")),
        },
    };

    if message.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Some(invalid_request(id, "jsonrpc must be \"2.0\""));
    }

    let Some(method_name) = message.get("method").and_then(Value::as_str) else {
        return Some(invalid_request(id, "method is missing"));
    };

    let Some(method) = McpMethod::parse(method_name) else {
        tracing::debug!(method = %method_name, "unsupported method");
        return id.map(|id| {
            JsonRpcResponse::failure(
                Some(id),
                McpError::MethodNotFound {
                    method: method_name.to_string(),
                }
                .to_jsonrpc_error(),
            )
        });
    };

    // Notifications are acknowledged without running anything.
    let Some(id) = id else {
        tracing::debug!(method = method.as_str(), "notification received");
        return None;
    };
    if method == McpMethod::Initialized {
        return None;
    }

    let params = message.get("params").cloned().unwrap_or(Value::Null);
    match dispatch(router, method, params).await {
        Ok(Some(result)) => Some(JsonRpcResponse::success(Some(id), result)),
        Ok(None) => None,
        Err(e) => {
            tracing::info!(method = method.as_str(), kind = e.kind(), error = %e, "request failed");
            Some(JsonRpcResponse::failure(Some(id), e.to_jsonrpc_error()))
        }
    }
}

fn invalid_request(id: Option<RequestId>, reason: &str) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        id,
        McpError::InvalidRequest {
            reason: reason.to_string(),
        }
        .to_jsonrpc_error(),
    )
}

// ─── Tests ───────────────────────────────────────────────────────────────────
