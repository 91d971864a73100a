//! GatewayManager — builds one catalog out of many upstreams.
//!
//! Owns one `UpstreamClient` per configured upstream, initializes them all
//! concurrently, and keeps the filtered, namespaced catalog used for both
//! listing and call routing.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;

use crate::config::UpstreamConfig;
use crate::mcp_client::{
    CallToolResult, Catalog, ClientState, ClientTimeouts, HttpTransport, McpError, Tool,
    Transport, UpstreamClient,
};

// ─── Types ───────────────────────────────────────────────────────────────────

/// One configured upstream and its client.
struct UpstreamSlot {
    config: UpstreamConfig,
    client: UpstreamClient,
}

/// Point-in-time view of one upstream, for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamStatus {
    pub name: String,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Tools discovered, before enable flags are applied.
    pub tool_count: usize,
}

// ─── GatewayManager ──────────────────────────────────────────────────────────

/// Aggregates the tools of a fixed set of upstreams.
pub struct GatewayManager {
    slots: Vec<UpstreamSlot>,
    catalog: Catalog,
    initialized: bool,
}

impl GatewayManager {
    /// Create a manager talking to each upstream over HTTP.
    ///
    /// No network traffic happens until `initialize`.
    pub fn new(
        configs: &[UpstreamConfig],
        timeouts: ClientTimeouts,
        http: reqwest::Client,
    ) -> Self {
        Self::with_transport(configs, timeouts, |config| {
            Arc::new(HttpTransport::new(&config.name, &config.url, http.clone()))
                as Arc<dyn Transport>
        })
    }

    /// Create a manager with a caller-supplied transport per upstream.
    ///
    /// When two entries share a name, the first one is kept.
    pub fn with_transport<F>(configs: &[UpstreamConfig], timeouts: ClientTimeouts, mut make: F) -> Self
    where
        F: FnMut(&UpstreamConfig) -> Arc<dyn Transport>,
    {
        let mut slots: Vec<UpstreamSlot> = Vec::with_capacity(configs.len());

        for config in configs {
            if slots.iter().any(|s| s.config.name == config.name) {
                tracing::warn!(
                    server = %config.name,
                    url = %config.url,
                    "duplicate upstream name, ignoring later entry"
                );
                continue;
            }
            let client = UpstreamClient::new(&config.name, make(config)).with_timeouts(timeouts);
            slots.push(UpstreamSlot {
                config: config.clone(),
                client,
            });
        }

        Self {
            slots,
            catalog: Catalog::new(),
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ─── Initialization ──────────────────────────────────────────────────

    /// Handshake with every upstream concurrently, then build the catalog.
    ///
    /// Waits for all upstreams to settle. A failing upstream contributes no
    /// tools and does not affect the others. Runs at most once.
    pub async fn initialize(&mut self) {
        if self.initialized {
            return;
        }

        join_all(self.slots.iter_mut().map(|slot| slot.client.initialize())).await;

        self.rebuild_catalog();
        self.initialized = true;

        let ready = self.slots.iter().filter(|s| s.client.is_ready()).count();
        tracing::info!(
            upstreams = self.slots.len(),
            ready,
            tools = self.catalog.len(),
            "gateway catalog built"
        );
    }

    /// Apply enable flags to the held discovery results in one pass.
    fn rebuild_catalog(&mut self) {
        let mut catalog = Catalog::new();

        for slot in &self.slots {
            for tool in slot.client.tools() {
                if !slot.config.is_tool_enabled(&tool.raw_name) {
                    tracing::debug!(
                        server = %slot.config.name,
                        tool = %tool.raw_name,
                        "tool disabled by config"
                    );
                    continue;
                }
                catalog.insert(&slot.config.name, tool.clone());
            }
        }

        self.catalog = catalog;
    }

    // ─── Catalog Access ──────────────────────────────────────────────────

    /// Every enabled tool of every ready upstream, namespaced.
    pub async fn get_all_tools(&mut self) -> &[Tool] {
        self.initialize().await;
        self.catalog.tools()
    }

    /// Whether `name` is in the current catalog. Never initializes.
    pub fn is_upstream_tool(&self, name: &str) -> bool {
        self.catalog.contains(name)
    }

    /// Route a call to the upstream that owns `name`.
    ///
    /// Returns `Ok(None)` when no upstream offers an enabled tool by that
    /// name. Invocation failures are returned unchanged.
    pub async fn call_upstream_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<Option<CallToolResult>, McpError> {
        self.initialize().await;

        let Some(owner) = self.catalog.owner_of(name).map(str::to_owned) else {
            return Ok(None);
        };
        let Some(slot) = self.slots.iter_mut().find(|s| s.config.name == owner) else {
            return Ok(None);
        };

        tracing::info!(tool = %name, server = %owner, "routing tool call upstream");
        slot.client.call_tool(name, arguments).await.map(Some)
    }

    // ─── Administration ──────────────────────────────────────────────────

    /// Enable or disable one tool of one upstream by its raw name.
    ///
    /// Rebuilds the catalog from held discovery results if already
    /// initialized; no upstream is contacted. Returns `false` for an unknown
    /// upstream.
    pub fn set_tool_enabled(&mut self, upstream: &str, raw_name: &str, enabled: bool) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.config.name == upstream) else {
            return false;
        };
        slot.config.set_tool_enabled(raw_name, enabled);
        tracing::info!(server = %upstream, tool = %raw_name, enabled, "tool enable flag changed");

        if self.initialized {
            self.rebuild_catalog();
        }
        true
    }

    /// State of every upstream, in configuration order.
    pub fn upstream_status(&self) -> Vec<UpstreamStatus> {
        self.slots
            .iter()
            .map(|slot| {
                let state = slot.client.state();
                UpstreamStatus {
                    name: slot.config.name.clone(),
                    state: state.label(),
                    reason: match state {
                        ClientState::Failed { reason } => Some(reason.clone()),
                        _ => None,
                    },
                    tool_count: slot.client.tools().len(),
                }
            })
            .collect()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
