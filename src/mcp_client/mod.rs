//! MCP Client — JSON-RPC over HTTP for upstream MCP servers.
//!
//! This module handles:
//! - JSON-RPC 2.0 envelopes and the MCP structures the gateway reads and writes
//! - Decoding plain JSON and event-stream response bodies
//! - The per-upstream handshake (`initialize`, then `tools/list`)
//! - Tool namespacing and call forwarding
//!
//! The GatewayManager owns one `UpstreamClient` per configured upstream.

pub mod client;
pub mod codec;
pub mod errors;
pub mod registry;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use client::{ClientState, ClientTimeouts, UpstreamClient};
pub use errors::McpError;
pub use registry::Catalog;
pub use transport::{HttpTransport, Transport};
pub use types::{CallToolResult, JsonRpcRequest, JsonRpcResponse, McpToolDefinition, Tool};
