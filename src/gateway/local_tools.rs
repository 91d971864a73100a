//! Tools served by the gateway itself.
//!
//! Local tool names are never namespaced and take precedence over upstream
//! tools with the same name.

use serde_json::{json, Value};

use crate::mcp_client::{CallToolResult, McpError, Tool};

use super::context::RequestContext;

/// The fixed set of built-in tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalTool {
    Echo,
    GetUserInfo,
    Timestamp,
}

impl LocalTool {
    pub const ALL: [LocalTool; 3] = [LocalTool::Echo, LocalTool::GetUserInfo, LocalTool::Timestamp];

    pub fn name(self) -> &'static str {
        match self {
            LocalTool::Echo => "echo",
            LocalTool::GetUserInfo => "get_user_info",
            LocalTool::Timestamp => "timestamp",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Catalog entry advertised in `tools/list`.
    pub fn definition(self) -> Tool {
        match self {
            LocalTool::Echo => Tool::local(
                self.name(),
                "Echo back a message together with the caller's identity",
                json!({
                    "type": "object",
                    "properties": {
                        "message": { "type": "string", "description": "Message to echo back" }
                    },
                    "required": ["message"]
                }),
            ),
            LocalTool::GetUserInfo => Tool::local(
                self.name(),
                "Get information about the authenticated caller",
                json!({ "type": "object", "properties": {} }),
            ),
            LocalTool::Timestamp => Tool::local(
                self.name(),
                "Get the current server time",
                json!({ "type": "object", "properties": {} }),
            ),
        }
    }

    /// Run the tool for `ctx`.
    pub fn call(self, arguments: &Value, ctx: &RequestContext) -> Result<CallToolResult, McpError> {
        let now = chrono::Utc::now().to_rfc3339();

        match self {
            LocalTool::Echo => {
                let message = arguments
                    .get("message")
                    .and_then(Value::as_str)
                    .ok_or_else(|| McpError::InvalidParams {
                        method: "tools/call".into(),
                        reason: "echo requires a string 'message' argument".into(),
                    })?;
                Ok(CallToolResult::text(format!(
                    "Echo: {message}\nUser: {}\nOrg: {}",
                    ctx.user_email.as_deref().unwrap_or("unknown"),
                    ctx.organization_id.as_deref().unwrap_or("none"),
                )))
            }
            LocalTool::GetUserInfo => {
                let info = json!({
                    "userId": ctx.user_id.as_deref().unwrap_or("unknown"),
                    "email": ctx.user_email.as_deref().unwrap_or("unknown"),
                    "organizationId": ctx.organization_id.as_deref().unwrap_or("none"),
                    "authenticated": ctx.is_authenticated(),
                    "timestamp": now,
                });
                let text = serde_json::to_string_pretty(&info).unwrap_or_else(|_| info.to_string());
                Ok(CallToolResult::text(text))
            }
            LocalTool::Timestamp => Ok(CallToolResult::text(format!(
                "Current server time: {now}"
            ))),
        }
    }
}

/// Definitions of every local tool, in advertisement order.
pub fn local_definitions() -> Vec<Tool> {
    LocalTool::ALL.into_iter().map(LocalTool::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RequestContext {
        RequestContext {
            user_id: Some("user_123".into()),
            organization_id: Some("org_9".into()),
            user_email: Some("dev@example.com".into()),
        }
    }

    fn text(result: &CallToolResult) -> &str {
        result.content[0].text.as_deref().unwrap()
    }

    #[test]
    fn test_from_name() {
        assert_eq!(LocalTool::from_name("echo"), Some(LocalTool::Echo));
        assert_eq!(LocalTool::from_name("timestamp"), Some(LocalTool::Timestamp));
        assert_eq!(LocalTool::from_name("github_search"), None);
    }

    #[test]
    fn test_echo_includes_identity() {
        let result = LocalTool::Echo
            .call(&json!({"message": "hi"}), &ctx())
            .unwrap();
        assert_eq!(text(&result), "Echo: hi\nUser: dev@example.com\nOrg: org_9");
    }

    #[test]
    fn test_echo_anonymous_defaults() {
        let result = LocalTool::Echo
            .call(&json!({"message": "hi"}), &RequestContext::default())
            .unwrap();
        assert_eq!(text(&result), "Echo: hi\nUser: unknown\nOrg: none");
    }

    #[test]
    fn test_echo_requires_message() {
        let err = LocalTool::Echo.call(&json!({"message": 5}), &ctx()).unwrap_err();
        assert!(matches!(err, McpError::InvalidParams { .. }));
    }

    #[test]
    fn test_get_user_info_is_json() {
        let result = LocalTool::GetUserInfo.call(&json!({}), &ctx()).unwrap();
        let info: Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(info["userId"], "user_123");
        assert_eq!(info["authenticated"], true);
        assert!(chrono::DateTime::parse_from_rfc3339(info["timestamp"].as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_get_user_info_anonymous_defaults() {
        let result = LocalTool::GetUserInfo
            .call(&json!({}), &RequestContext::default())
            .unwrap();
        let info: Value = serde_json::from_str(text(&result)).unwrap();
        assert_eq!(info["userId"], "unknown");
        assert_eq!(info["email"], "unknown");
        assert_eq!(info["organizationId"], "none");
        assert_eq!(info["authenticated"], false);
    }

    #[test]
    fn test_timestamp_format() {
        let result = LocalTool::Timestamp.call(&Value::Null, &ctx()).unwrap();
        let stamp = text(&result).strip_prefix("Current server time: ").unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[test]
    fn test_definitions_have_schemas() {
        let defs = local_definitions();
        assert_eq!(defs.len(), 3);
        assert!(defs.iter().all(|d| d.input_schema.is_some()));
        assert_eq!(defs[0].input_schema.as_ref().unwrap()["required"][0], "message");
    }
}
