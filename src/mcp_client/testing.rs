//! Scripted in-memory upstream used by unit tests across the crate.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::errors::McpError;
use super::transport::Transport;
use super::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};

/// How the scripted upstream answers.
#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Answers every method normally.
    Healthy,
    /// Every exchange fails at the transport level.
    Unreachable,
    /// `initialize` result lacks `protocolVersion`.
    MissingProtocolVersion,
    /// Handshake works, `tools/call` returns a JSON-RPC error object.
    CallFails { code: i32, message: String },
    /// Never answers.
    Hang,
}

/// A `Transport` double that records every request it receives.
pub(crate) struct ScriptedTransport {
    server: String,
    tools: Vec<String>,
    behavior: Behavior,
    requests: Mutex<Vec<JsonRpcRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(server: &str, tools: &[&str], behavior: Behavior) -> Self {
        Self {
            server: server.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn healthy(server: &str, tools: &[&str]) -> Self {
        Self::new(server, tools, Behavior::Healthy)
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.method.clone())
            .collect()
    }

    pub(crate) fn last_request(&self) -> Option<JsonRpcRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn respond(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = Some(request.id.clone());
        match request.method.as_str() {
            "initialize" => {
                let mut result = json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": self.server, "version": "0.0.1" }
                });
                if matches!(self.behavior, Behavior::MissingProtocolVersion) {
                    if let Some(obj) = result.as_object_mut() {
                        obj.remove("protocolVersion");
                    }
                }
                JsonRpcResponse::success(id, result)
            }
            "tools/list" => {
                let tools: Vec<_> = self
                    .tools
                    .iter()
                    .map(|t| {
                        json!({
                            "name": t,
                            "description": format!("{t} from {}", self.server),
                            "inputSchema": { "type": "object" }
                        })
                    })
                    .collect();
                JsonRpcResponse::success(id, json!({ "tools": tools }))
            }
            "tools/call" => match &self.behavior {
                Behavior::CallFails { code, message } => JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(*code, message.clone(), None),
                ),
                _ => {
                    let name = request.params["name"].as_str().unwrap_or_default();
                    JsonRpcResponse::success(
                        id,
                        json!({
                            "content": [{
                                "type": "text",
                                "text": format!("{}:{name}:{}", self.server, request.params["arguments"])
                            }]
                        }),
                    )
                }
            },
            other => JsonRpcResponse::failure(
                id,
                JsonRpcError::new(-32601, format!("Method not found: {other}"), None),
            ),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        self.requests.lock().unwrap().push(request.clone());

        match self.behavior {
            Behavior::Unreachable => Err(McpError::TransportError {
                server: self.server.clone(),
                reason: "connection refused".into(),
            }),
            Behavior::Hang => std::future::pending().await,
            _ => Ok(self.respond(request)),
        }
    }
}
