//! MCP Client error types.

use thiserror::Error;

use super::types::{error_codes, JsonRpcError};

/// Errors that can occur while talking to an upstream MCP server or while
/// answering a downstream request.
#[derive(Debug, Error)]
pub enum McpError {
    /// Connection failure, I/O error, or an unreadable response body.
    #[error("transport error for server '{server}': {reason}")]
    TransportError {
        server: String,
        reason: String,
    },

    /// The upstream answered with a non-2xx HTTP status.
    #[error("server '{server}' returned HTTP {status}: {body}")]
    HttpStatus {
        server: String,
        status: u16,
        body: String,
    },

    /// The upstream did not answer within the configured timeout.
    #[error("'{method}' to server '{server}' timed out after {timeout_ms}ms")]
    Timeout {
        server: String,
        method: String,
        timeout_ms: u64,
    },

    /// Server returned a JSON-RPC error object.
    #[error("server '{server}' error [{code}]: {message}")]
    ServerError {
        server: String,
        code: i32,
        message: String,
        data: Option<serde_json::Value>,
    },

    /// Body could not be parsed, or required fields were missing.
    #[error("malformed response from server '{server}': {reason}")]
    MalformedResponse {
        server: String,
        reason: String,
    },

    /// The initialization handshake failed earlier; the client is not retried.
    #[error("server '{name}' initialization failed: {reason}")]
    InitFailed {
        name: String,
        reason: String,
    },

    /// No local or upstream tool has this name.
    #[error("Tool not found: {name}")]
    UnknownTool {
        name: String,
    },

    /// Request parameters did not match what the method expects.
    #[error("invalid params for '{method}': {reason}")]
    InvalidParams {
        method: String,
        reason: String,
    },

    /// The method is outside the supported set.
    #[error("Method not found: {method}")]
    MethodNotFound {
        method: String,
    },

    /// The message is not a valid JSON-RPC 2.0 request.
    #[error("Invalid Request: {reason}")]
    InvalidRequest {
        reason: String,
    },

    /// A failure inside the gateway itself.
    #[error("internal error: {reason}")]
    Internal {
        reason: String,
    },
}

impl McpError {
    /// Short category name for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::TransportError { .. }
            | McpError::HttpStatus { .. }
            | McpError::Timeout { .. } => "transport",
            McpError::ServerError { .. } => "protocol",
            McpError::MalformedResponse { .. } => "malformed",
            McpError::InitFailed { .. } => "handshake",
            McpError::UnknownTool { .. } => "tool_not_found",
            McpError::InvalidParams { .. }
            | McpError::MethodNotFound { .. }
            | McpError::InvalidRequest { .. } => "request",
            McpError::Internal { .. } => "internal",
        }
    }

    /// Convert into the JSON-RPC error object sent downstream.
    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        match self {
            McpError::InvalidRequest { .. } => JsonRpcError::new(
                error_codes::INVALID_REQUEST,
                "Invalid Request - must be JSON-RPC 2.0".to_string(),
                Some(serde_json::Value::String(self.to_string())),
            ),
            McpError::MethodNotFound { .. } => {
                JsonRpcError::new(error_codes::METHOD_NOT_FOUND, self.to_string(), None)
            }
            McpError::UnknownTool { .. } | McpError::InvalidParams { .. } => {
                JsonRpcError::new(error_codes::INVALID_PARAMS, self.to_string(), None)
            }
            McpError::ServerError {
                code,
                message,
                data,
                ..
            } => JsonRpcError::new(*code, message.clone(), data.clone()),
            _ => JsonRpcError::new(
                error_codes::INTERNAL_ERROR,
                "Internal error".to_string(),
                Some(serde_json::Value::String(self.to_string())),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_groups_transport_failures() {
        let errors = [
            McpError::TransportError {
                server: "a".into(),
                reason: "refused".into(),
            },
            McpError::HttpStatus {
                server: "a".into(),
                status: 502,
                body: String::new(),
            },
            McpError::Timeout {
                server: "a".into(),
                method: "tools/list".into(),
                timeout_ms: 10,
            },
        ];
        for e in &errors {
            assert_eq!(e.kind(), "transport");
        }
    }

    #[test]
    fn test_unknown_tool_maps_to_invalid_params() {
        let err = McpError::UnknownTool {
            name: "github_search".into(),
        };
        let rpc = err.to_jsonrpc_error();
        assert_eq!(rpc.code, error_codes::INVALID_PARAMS);
        assert_eq!(rpc.message, "Tool not found: github_search");
    }

    #[test]
    fn test_server_error_keeps_upstream_code() {
        let err = McpError::ServerError {
            server: "a".into(),
            code: -32050,
            message: "quota exceeded".into(),
            data: None,
        };
        let rpc = err.to_jsonrpc_error();
        assert_eq!(rpc.code, -32050);
        assert_eq!(rpc.message, "quota exceeded");
    }

    #[test]
    fn test_transport_error_is_internal_downstream() {
        let err = McpError::TransportError {
            server: "a".into(),
            reason: "connection refused".into(),
        };
        let rpc = err.to_jsonrpc_error();
        assert_eq!(rpc.code, error_codes::INTERNAL_ERROR);
        assert!(rpc.data.unwrap().as_str().unwrap().contains("connection refused"));
    }
}
