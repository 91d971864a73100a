//! One-off tool discovery for a single upstream.
//!
//! Used when an upstream is being registered: lists what it offers, under
//! the names the upstream itself uses.

use std::sync::Arc;

use crate::mcp_client::{ClientTimeouts, McpToolDefinition, Transport, UpstreamClient};

/// Handshake with a throwaway client and return the raw tool definitions.
///
/// Any failure yields an empty list.
pub async fn fetch_server_tools(
    name: &str,
    transport: Arc<dyn Transport>,
    timeouts: ClientTimeouts,
) -> Vec<McpToolDefinition> {
    let mut client = UpstreamClient::new(name, transport).with_timeouts(timeouts);
    client.initialize().await;

    if !client.is_ready() {
        tracing::warn!(server = %name, "probe failed, reporting no tools");
        return Vec::new();
    }

    client.tools().iter().map(|t| t.to_raw_definition()).collect()
}
