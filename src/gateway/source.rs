//! Per-caller upstream resolution.

use async_trait::async_trait;

use crate::config::{GatewayConfig, UpstreamConfig};

use super::context::RequestContext;
use super::errors::GatewayError;

/// Supplies the upstreams enabled for a caller. Queried once per request.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn enabled_upstreams(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<UpstreamConfig>, GatewayError>;
}

/// Upstream lists taken from the loaded config file.
pub struct StaticConfigSource {
    config: GatewayConfig,
}

impl StaticConfigSource {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConfigSource for StaticConfigSource {
    async fn enabled_upstreams(
        &self,
        ctx: &RequestContext,
    ) -> Result<Vec<UpstreamConfig>, GatewayError> {
        Ok(self.config.upstreams_for(ctx.user_id.as_deref()).to_vec())
    }
}
