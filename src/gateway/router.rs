//! ToolRouter — one downstream caller's view of local and upstream tools.
//!
//! Local tools are listed first and always win on a name clash. Everything
//! else goes through the caller's `GatewayManager`.

use serde_json::Value;

use crate::mcp_client::{CallToolResult, McpError, Tool};

use super::context::RequestContext;
use super::local_tools::{local_definitions, LocalTool};
use super::manager::GatewayManager;

// ─── ToolRouter ──────────────────────────────────────────────────────────────

/// Serves `tools/list` and `tools/call` for one request.
pub struct ToolRouter {
    manager: GatewayManager,
    context: RequestContext,
}

impl ToolRouter {
    pub fn new(manager: GatewayManager, context: RequestContext) -> Self {
        Self { manager, context }
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub fn manager(&self) -> &GatewayManager {
        &self.manager
    }

    /// Local tools followed by the upstream catalog.
    ///
    /// An upstream tool whose namespaced name matches a local tool is omitted.
    pub async fn list_tools(&mut self) -> Vec<Tool> {
        let mut tools = local_definitions();

        for tool in self.manager.get_all_tools().await {
            if LocalTool::from_name(&tool.name).is_some() {
                tracing::warn!(tool = %tool.name, "upstream tool shadowed by local tool");
                continue;
            }
            tools.push(tool.clone());
        }

        tools
    }

    /// Run a local tool or forward to the owning upstream.
    ///
    /// `Ok(None)` means no tool by that name exists for this caller.
    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Option<CallToolResult>, McpError> {
        if let Some(local) = LocalTool::from_name(name) {
            tracing::info!(tool = %name, "running local tool");
            return local.call(&arguments, &self.context).map(Some);
        }

        self.manager.initialize().await;
        if !self.manager.is_upstream_tool(name) {
            tracing::debug!(tool = %name, "tool not found");
            return Ok(None);
        }
        self.manager.call_upstream_tool(name, arguments).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::config::UpstreamConfig;
    use crate::mcp_client::testing::ScriptedTransport;
    use crate::mcp_client::{ClientTimeouts, Transport};

    fn router_with(server: &str, tools: &[&str]) -> (ToolRouter, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::healthy(server, tools));
        let configs = vec![UpstreamConfig::new(server, "http://upstream.test/mcp")];
        let shared = transport.clone();
        let manager = GatewayManager::with_transport(&configs, ClientTimeouts::default(), |_| {
            shared.clone() as Arc<dyn Transport>
        });
        let ctx = RequestContext::new("user_123");
        (ToolRouter::new(manager, ctx), transport)
    }

    #[tokio::test]
    async fn test_list_tools_locals_first() {
        let (mut router, _) = router_with("github", &["search"]);
        let names: Vec<String> = router.list_tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "get_user_info", "timestamp", "github_search"]);
    }

    #[tokio::test]
    async fn test_local_name_shadows_upstream_tool() {
        // "get" + "user_info" namespaces to the local "get_user_info".
        let (mut router, _) = router_with("get", &["user_info", "weather"]);
        let names: Vec<String> = router.list_tools().await.into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "get_user_info", "timestamp", "get_weather"]);

        let result = router
            .call_tool("get_user_info", json!({}))
            .await
            .unwrap()
            .unwrap();
        assert!(result.content[0].text.as_deref().unwrap().contains("user_123"));
    }

    #[tokio::test]
    async fn test_local_call_skips_upstreams() {
        let (mut router, transport) = router_with("github", &["search"]);
        let result = router
            .call_tool("echo", json!({"message": "ping"}))
            .await
            .unwrap()
            .unwrap();
        assert!(result.content[0].text.as_deref().unwrap().starts_with("Echo: ping"));
        assert_eq!(transport.request_count(), 0);
        assert!(!router.manager().is_initialized());
    }

    #[tokio::test]
    async fn test_upstream_call_initializes_first() {
        let (mut router, transport) = router_with("github", &["search"]);
        let result = router
            .call_tool("github_search", json!({"q": "x"}))
            .await
            .unwrap();
        assert!(result.is_some());
        assert_eq!(
            transport.methods(),
            vec!["initialize", "tools/list", "tools/call"]
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_none() {
        let (mut router, _) = router_with("github", &["search"]);
        assert!(router.call_tool("nope", json!({})).await.unwrap().is_none());
        assert!(router.manager().is_initialized());
    }
}
