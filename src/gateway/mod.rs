//! Gateway — aggregation of many upstream MCP servers into one catalog.
//!
//! This module handles:
//! - Concurrent upstream initialization and catalog building (`GatewayManager`)
//! - Local tools and per-caller routing (`ToolRouter`)
//! - Downstream JSON-RPC validation and dispatch
//! - Resolving which upstreams a caller may use (`ConfigSource`)

pub mod context;
pub mod dispatch;
pub mod errors;
pub mod fetcher;
pub mod local_tools;
pub mod manager;
pub mod router;
pub mod source;

// Re-exports for convenience
pub use context::RequestContext;
pub use dispatch::{handle_message, McpMethod};
pub use errors::GatewayError;
pub use manager::{GatewayManager, UpstreamStatus};
pub use router::ToolRouter;
pub use source::{ConfigSource, StaticConfigSource};
