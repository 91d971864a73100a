//! Envelope encoding and response-body decoding.
//!
//! Upstreams answer a POST either with a plain JSON body or with an
//! event-stream body that carries one JSON-RPC message split across
//! `data:` lines. Both decode to the same `JsonRpcResponse`.

use serde_json::Value;

use super::errors::McpError;
use super::types::{JsonRpcRequest, JsonRpcResponse};

/// Content type of event-stream encoded bodies.
pub const EVENT_STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Marker that prefixes each payload line of an event-stream body.
const DATA_MARKER: &str = "data:";

/// How a response body is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    EventStream,
}

impl BodyEncoding {
    /// Pick the encoding from the `Content-Type` header, falling back to the
    /// shape of the body when the header is missing or generic.
    pub fn detect(content_type: Option<&str>, body: &str) -> Self {
        if let Some(ct) = content_type {
            if ct.to_ascii_lowercase().contains(EVENT_STREAM_CONTENT_TYPE) {
                return BodyEncoding::EventStream;
            }
            if ct.to_ascii_lowercase().contains("json") {
                return BodyEncoding::Json;
            }
        }

        let first_line = body.lines().map(str::trim).find(|l| !l.is_empty());
        match first_line {
            Some(line) if line.starts_with(DATA_MARKER) || line.starts_with("event:") => {
                BodyEncoding::EventStream
            }
            _ => BodyEncoding::Json,
        }
    }
}

/// Serialize a request envelope for the wire.
pub fn encode_request(server: &str, request: &JsonRpcRequest) -> Result<String, McpError> {
    serde_json::to_string(request).map_err(|e| McpError::TransportError {
        server: server.to_string(),
        reason: format!("failed to serialize '{}' request: {e}", request.method),
    })
}

/// Concatenate the payloads of every `data:` line, in order.
///
/// Returns `None` when the body has no data lines at all.
pub fn reassemble_event_stream(body: &str) -> Option<String> {
    let mut payload = String::new();
    let mut found = false;

    for line in body.lines() {
        if let Some(data) = line.strip_prefix(DATA_MARKER) {
            let data = data.strip_prefix(' ').unwrap_or(data);
            payload.push_str(data.trim_end_matches('\r'));
            found = true;
        }
        // Other lines (event:, id:, comments, blank separators) carry no payload.
    }

    found.then_some(payload)
}

/// Decode a response body into a JSON-RPC envelope.
pub fn decode_response(
    server: &str,
    content_type: Option<&str>,
    body: &str,
) -> Result<JsonRpcResponse, McpError> {
    let json = match BodyEncoding::detect(content_type, body) {
        BodyEncoding::Json => body.to_string(),
        BodyEncoding::EventStream => {
            reassemble_event_stream(body).ok_or_else(|| McpError::MalformedResponse {
                server: server.to_string(),
                reason: "no data found in event-stream response".into(),
            })?
        }
    };

    serde_json::from_str(&json).map_err(|e| McpError::MalformedResponse {
        server: server.to_string(),
        reason: format!("invalid JSON-RPC body: {e}"),
    })
}

/// Extract the result from a JSON-RPC response, converting errors to `McpError`.
pub fn extract_result(server: &str, response: JsonRpcResponse) -> Result<Value, McpError> {
    if let Some(err) = response.error {
        return Err(McpError::ServerError {
            server: server.to_string(),
            code: err.code,
            message: err.message,
            data: err.data,
        });
    }

    response.result.ok_or_else(|| McpError::MalformedResponse {
        server: server.to_string(),
        reason: "response missing both result and error".into(),
    })
}

// ─── Tests ───────────────────────────────────────────────────────────────────
