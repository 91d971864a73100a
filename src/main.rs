use anyhow::Context;

use mcp_gateway::config::{find_config_path, load_gateway_config, GatewayConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("failed to read working directory")?;
    let config_path = find_config_path(&cwd)?;
    let config = match &config_path {
        Some(path) => load_gateway_config(path)?,
        None => GatewayConfig::default(),
    };

    let log_file = mcp_gateway::init_tracing(config.log_dir.as_deref(), config.log_json)?;

    // Startup banner
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(defaults)".into()),
        log_file = %log_file
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stderr".into()),
        bind = %config.bind,
        upstreams = config.upstreams.len(),
        users = config.users.len(),
        pid = std::process::id(),
        "=== MCP gateway starting ==="
    );

    mcp_gateway::server::serve(config).await?;
    Ok(())
}
