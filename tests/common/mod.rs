//! Mock upstream MCP servers for integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const MCP_PATH: &str = "/mcp";

/// Answers `initialize`, `tools/list` and `tools/call` like a minimal
/// upstream. `tools/call` echoes the tool name and arguments back.
#[derive(Clone)]
pub struct FakeUpstream {
    pub name: String,
    pub tools: Vec<String>,
    /// Answer with `text/event-stream` bodies instead of plain JSON.
    pub event_stream: bool,
}

impl FakeUpstream {
    pub fn new(name: &str, tools: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            event_stream: false,
        }
    }

    pub fn event_stream(mut self) -> Self {
        self.event_stream = true;
        self
    }

    fn result_for(&self, request: &Value) -> Value {
        let params = &request["params"];
        match request["method"].as_str().unwrap_or_default() {
            "initialize" => json!({
                "protocolVersion": "2024-11-05",
                "capabilities": { "tools": {} },
                "serverInfo": { "name": self.name, "version": "1.0.0" }
            }),
            "tools/list" => json!({
                "tools": self.tools.iter().map(|t| json!({
                    "name": t,
                    "description": format!("{t} on {}", self.name),
                    "inputSchema": { "type": "object" }
                })).collect::<Vec<_>>()
            }),
            "tools/call" => json!({
                "content": [{
                    "type": "text",
                    "text": format!("{} ran {} with {}", self.name, params["name"].as_str().unwrap_or_default(), params["arguments"])
                }]
            }),
            other => panic!("unexpected method {other}"),
        }
    }
}

impl Respond for FakeUpstream {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": self.result_for(&body),
        });

        if self.event_stream {
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(format!("event: message\ndata: {envelope}\n\n"))
        } else {
            ResponseTemplate::new(200).set_body_json(envelope)
        }
    }
}

/// Mount one mock per method so call counts can be asserted per method.
///
/// `expected` is `(initialize, tools/list, tools/call)`; `None` leaves the
/// count unchecked.
pub async fn mount_upstream(
    server: &MockServer,
    upstream: FakeUpstream,
    expected: Option<(u64, u64, u64)>,
) {
    let methods = ["initialize", "tools/list", "tools/call"];
    let counts = expected.map(|(a, b, c)| [a, b, c]);

    for (i, rpc_method) in methods.iter().enumerate() {
        let mut mock = Mock::given(method("POST"))
            .and(path(MCP_PATH))
            .and(body_partial_json(json!({ "method": rpc_method })))
            .respond_with(upstream.clone());
        if let Some(counts) = counts {
            mock = mock.expect(counts[i]);
        }
        mock.mount(server).await;
    }
}

pub fn upstream_url(server: &MockServer) -> String {
    format!("{}{MCP_PATH}", server.uri())
}
