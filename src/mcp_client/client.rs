//! UpstreamClient — one upstream MCP server behind a private namespace.
//!
//! Performs the two-step handshake (`initialize`, then `tools/list`),
//! namespaces the discovered tools as `"<server>_<tool>"`, and forwards
//! `tools/call` requests with the prefix stripped again.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use super::codec;
use super::errors::McpError;
use super::transport::Transport;
use super::types::{
    CallToolResult, Implementation, InitializeParams, InitializeResult, JsonRpcRequest,
    ListToolsResult, RequestId, Tool,
};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default bound on the whole handshake.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound on a single `tools/call`.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

// ─── Types ───────────────────────────────────────────────────────────────────

/// Deadlines applied to upstream exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientTimeouts {
    /// Bound on `initialize` + `tools/list` together.
    pub initialize: Duration,
    /// Bound on one `tools/call`.
    pub call: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            initialize: DEFAULT_INIT_TIMEOUT,
            call: DEFAULT_CALL_TIMEOUT,
        }
    }
}

/// Handshake state of an upstream client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientState {
    Uninitialized,
    Initializing,
    Ready,
    Failed { reason: String },
}

impl ClientState {
    /// Lowercase label for logs and status reports.
    pub fn label(&self) -> &'static str {
        match self {
            ClientState::Uninitialized => "uninitialized",
            ClientState::Initializing => "initializing",
            ClientState::Ready => "ready",
            ClientState::Failed { .. } => "failed",
        }
    }
}

// ─── UpstreamClient ──────────────────────────────────────────────────────────

/// Protocol client for exactly one upstream endpoint.
pub struct UpstreamClient {
    name: String,
    prefix: String,
    transport: Arc<dyn Transport>,
    timeouts: ClientTimeouts,
    state: ClientState,
    /// Namespaced tools; empty unless `Ready`.
    tools: Vec<Tool>,
    server_info: Option<Implementation>,
    protocol_version: Option<String>,
    next_id: i64,
}

impl UpstreamClient {
    /// Create a client. No network traffic happens until `initialize`.
    pub fn new(name: &str, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: name.to_string(),
            prefix: format!("{name}_"),
            transport,
            timeouts: ClientTimeouts::default(),
            state: ClientState::Uninitialized,
            tools: Vec::new(),
            server_info: None,
            protocol_version: None,
            next_id: 0,
        }
    }

    /// Override the default deadlines.
    pub fn with_timeouts(mut self, timeouts: ClientTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Ready
    }

    /// Identity reported by the upstream during `initialize`.
    pub fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    /// Protocol version reported by the upstream during `initialize`.
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Discovered tools, already namespaced. Empty unless `Ready`.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Recover the upstream's own tool name from a namespaced one.
    ///
    /// Names without this client's prefix are returned unchanged.
    pub fn raw_tool_name<'a>(&self, namespaced: &'a str) -> &'a str {
        namespaced.strip_prefix(&self.prefix).unwrap_or(namespaced)
    }

    // ─── Handshake ───────────────────────────────────────────────────────

    /// Run the handshake once.
    ///
    /// Failures are logged and recorded as `Failed`; they are never returned.
    /// Calls after the client reached `Ready` or `Failed` return immediately.
    pub async fn initialize(&mut self) {
        if matches!(self.state, ClientState::Ready | ClientState::Failed { .. }) {
            return;
        }
        self.state = ClientState::Initializing;

        let deadline = self.timeouts.initialize;
        let attempt = tokio::time::timeout(deadline, self.handshake()).await;
        let outcome = match attempt {
            Ok(result) => result,
            Err(_) => Err(McpError::Timeout {
                server: self.name.clone(),
                method: "initialize".into(),
                timeout_ms: deadline.as_millis() as u64,
            }),
        };

        match outcome {
            Ok(tools) => {
                tracing::info!(
                    server = %self.name,
                    tool_count = tools.len(),
                    protocol = self.protocol_version.as_deref().unwrap_or_default(),
                    "upstream ready"
                );
                self.tools = tools;
                self.state = ClientState::Ready;
            }
            Err(e) => {
                tracing::warn!(
                    server = %self.name,
                    kind = e.kind(),
                    error = %e,
                    "upstream initialization failed"
                );
                self.tools.clear();
                self.state = ClientState::Failed {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Capability negotiation, then tool discovery.
    async fn handshake(&mut self) -> Result<Vec<Tool>, McpError> {
        let params = serde_json::to_value(InitializeParams::gateway()).map_err(|e| {
            McpError::TransportError {
                server: self.name.clone(),
                reason: format!("failed to encode initialize params: {e}"),
            }
        })?;

        let result = self.request("initialize", params).await?;
        let init: InitializeResult =
            serde_json::from_value(result).map_err(|e| self.malformed("initialize", e))?;

        let version = init
            .protocol_version
            .filter(|v| !v.is_empty())
            .ok_or_else(|| McpError::MalformedResponse {
                server: self.name.clone(),
                reason: "initialize result has no protocolVersion".into(),
            })?;
        self.protocol_version = Some(version);
        self.server_info = init.server_info;

        let result = self.request("tools/list", json!({})).await?;
        let listed: ListToolsResult =
            serde_json::from_value(result).map_err(|e| self.malformed("tools/list", e))?;

        Ok(listed
            .tools
            .into_iter()
            .map(|def| Tool::namespaced(&self.name, def))
            .collect())
    }

    // ─── Tool Execution ──────────────────────────────────────────────────

    /// Invoke a tool by its namespaced name.
    ///
    /// Initializes lazily. Unlike handshake failures, every failure here is
    /// returned to the caller.
    pub async fn call_tool(
        &mut self,
        namespaced_name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, McpError> {
        if !self.is_ready() {
            self.initialize().await;
        }
        if let ClientState::Failed { reason } = &self.state {
            return Err(McpError::InitFailed {
                name: self.name.clone(),
                reason: reason.clone(),
            });
        }

        let raw_name = self.raw_tool_name(namespaced_name).to_string();
        tracing::debug!(server = %self.name, tool = %raw_name, "forwarding tool call");

        let params = json!({ "name": raw_name, "arguments": arguments });
        let deadline = self.timeouts.call;
        let attempt = tokio::time::timeout(deadline, self.request("tools/call", params)).await;
        let result = match attempt {
            Ok(result) => result?,
            Err(_) => {
                return Err(McpError::Timeout {
                    server: self.name.clone(),
                    method: "tools/call".into(),
                    timeout_ms: deadline.as_millis() as u64,
                })
            }
        };

        serde_json::from_value(result).map_err(|e| self.malformed("tools/call", e))
    }

    // ─── Exchange ────────────────────────────────────────────────────────

    /// One request/response exchange; returns the `result` member.
    async fn request(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        self.next_id += 1;
        let request = JsonRpcRequest::new(RequestId::Number(self.next_id), method, params);
        let response = self.transport.send(&request).await?;
        codec::extract_result(&self.name, response)
    }

    fn malformed(&self, method: &str, e: serde_json::Error) -> McpError {
        McpError::MalformedResponse {
            server: self.name.clone(),
            reason: format!("unexpected {method} result: {e}"),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
