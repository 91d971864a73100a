//! JSON-RPC over HTTP transport.
//!
//! One request/response exchange per POST:
//! - Writing the JSON-RPC envelope as the request body
//! - Reading either a JSON or an event-stream body back
//! - Mapping connection failures and non-2xx statuses to `McpError`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client as HttpClient;

use super::codec;
use super::errors::McpError;
use super::types::{JsonRpcRequest, JsonRpcResponse};

// ─── Constants ───────────────────────────────────────────────────────────────

/// Both encodings an upstream may answer with.
const ACCEPT_BOTH: &str = "application/json, text/event-stream";

/// Longest error body kept in `McpError::HttpStatus`.
const MAX_ERROR_BODY_CHARS: usize = 2000;

// ─── Transport ───────────────────────────────────────────────────────────────

/// A single request/response exchange with one upstream.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the decoded response envelope.
    ///
    /// Protocol-level error objects are returned inside the envelope; only
    /// transport and decoding failures are `Err`.
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError>;
}

/// HTTP POST transport for one upstream endpoint.
pub struct HttpTransport {
    server_name: String,
    url: String,
    http: HttpClient,
}

impl HttpTransport {
    /// Create a transport for `url`. The HTTP client (and its connection
    /// pool) may be shared between transports.
    pub fn new(server_name: &str, url: &str, http: HttpClient) -> Self {
        Self {
            server_name: server_name.to_string(),
            url: url.to_string(),
            http,
        }
    }

    /// Build the shared HTTP client used for upstream requests.
    ///
    /// Only the connect phase is bounded here; request deadlines are applied
    /// per call by the `UpstreamClient`.
    pub fn http_client(connect_timeout: Duration) -> Result<HttpClient, reqwest::Error> {
        HttpClient::builder()
            .connect_timeout(connect_timeout)
            .build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &JsonRpcRequest) -> Result<JsonRpcResponse, McpError> {
        let body = codec::encode_request(&self.server_name, request)?;

        tracing::debug!(
            server = %self.server_name,
            method = %request.method,
            id = %request.id,
            "sending upstream request"
        );

        let response = self
            .http
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, ACCEPT_BOTH)
            .body(body)
            .send()
            .await
            .map_err(|e| McpError::TransportError {
                server: self.server_name.clone(),
                reason: format!("request to {} failed: {e}", self.url),
            })?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let text = response.text().await.map_err(|e| McpError::TransportError {
            server: self.server_name.clone(),
            reason: format!("failed to read response body: {e}"),
        })?;

        if !status.is_success() {
            tracing::warn!(
                server = %self.server_name,
                status = status.as_u16(),
                "upstream returned non-success status"
            );
            return Err(McpError::HttpStatus {
                server: self.server_name.clone(),
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        codec::decode_response(&self.server_name, content_type.as_deref(), &text)
    }
}

/// Cap an error body so log lines and error messages stay readable.
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut out: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    out.push_str("...(truncated)");
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
