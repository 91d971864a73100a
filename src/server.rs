//! HTTP boundary — the downstream MCP endpoint.
//!
//! Endpoints:
//! - `POST /mcp`: one JSON-RPC message
//! - `GET /mcp`: server info, or health with `?action=health`
//!   (add `&upstreams=1` to handshake with the caller's upstreams)
//! - `OPTIONS /mcp`: CORS preflight
//! - `POST /upstreams/probe`: list a prospective upstream's tools
//!
//! Every request gets its own `GatewayManager` and `ToolRouter`, built from
//! the caller's upstream list.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::gateway::fetcher::fetch_server_tools;
use crate::gateway::{
    handle_message, ConfigSource, GatewayError, GatewayManager, RequestContext,
    StaticConfigSource, ToolRouter,
};
use crate::mcp_client::types::{
    error_codes, Implementation, JsonRpcError, JsonRpcResponse, RequestId, PROTOCOL_VERSION,
};
use crate::mcp_client::{ClientTimeouts, HttpTransport, McpError};

// ─── Constants ───────────────────────────────────────────────────────────────

pub const USER_ID_HEADER: &str = "x-mcp-user-id";
pub const ORGANIZATION_ID_HEADER: &str = "x-mcp-organization-id";
pub const USER_EMAIL_HEADER: &str = "x-mcp-user-email";

// ─── State ───────────────────────────────────────────────────────────────────

/// Shared by every request. Holds no catalog state.
#[derive(Clone)]
pub struct AppState {
    source: Arc<dyn ConfigSource>,
    timeouts: ClientTimeouts,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(source: Arc<dyn ConfigSource>, timeouts: ClientTimeouts, http: reqwest::Client) -> Self {
        Self {
            source,
            timeouts,
            http,
        }
    }

    /// Build a fresh router for one caller.
    async fn tool_router(&self, ctx: RequestContext) -> Result<ToolRouter, GatewayError> {
        let upstreams = self.source.enabled_upstreams(&ctx).await?;
        tracing::debug!(upstreams = upstreams.len(), "resolved caller upstreams");
        let manager = GatewayManager::new(&upstreams, self.timeouts, self.http.clone());
        Ok(ToolRouter::new(manager, ctx))
    }
}

/// All routes, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(handle_mcp_post)
                .get(handle_mcp_get)
                .options(handle_preflight),
        )
        .route("/upstreams/probe", post(handle_probe))
        .layer(cors_layer())
        .with_state(state)
}

/// Browser MCP clients call from any origin.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Bind, then serve until Ctrl-C.
pub async fn serve(config: GatewayConfig) -> Result<(), GatewayError> {
    let http = HttpTransport::http_client(config.timeouts.connect()).map_err(|e| {
        GatewayError::HttpClient {
            reason: e.to_string(),
        }
    })?;
    let state = AppState::new(
        Arc::new(StaticConfigSource::new(config.clone())),
        config.timeouts.client_timeouts(),
        http,
    );

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .map_err(|e| GatewayError::ServerError {
            reason: format!("failed to bind {}: {e}", config.bind),
        })?;
    let addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| config.bind.clone());
    tracing::info!(%addr, "MCP gateway listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::ServerError {
            reason: e.to_string(),
        })?;

    tracing::info!("MCP gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("received Ctrl+C, shutting down"),
        Err(e) => tracing::error!(error = %e, "failed to listen for Ctrl+C"),
    }
}

// ─── Identity ────────────────────────────────────────────────────────────────

/// Read the caller identity set by the auth layer.
pub fn context_from_headers(headers: &HeaderMap) -> RequestContext {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };

    RequestContext {
        user_id: read(USER_ID_HEADER),
        organization_id: read(ORGANIZATION_ID_HEADER),
        user_email: read(USER_EMAIL_HEADER),
    }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

async fn handle_mcp_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let ctx = context_from_headers(&headers);
    let span = tracing::info_span!(
        "mcp_request",
        request_id = %uuid::Uuid::new_v4(),
        user = ctx.user_id.as_deref().unwrap_or("anonymous"),
    );

    async move {
        let message: Value = match serde_json::from_slice(&body) {
            Ok(v) => v,
            Err(e) => {
                tracing::info!(error = %e, "unparseable request body");
                let error = JsonRpcError::new(error_codes::PARSE_ERROR, "Parse error".into(), None);
                return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::failure(None, error)))
                    .into_response();
            }
        };

        let mut tool_router = match state.tool_router(ctx).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "failed to resolve upstreams");
                let id = message
                    .get("id")
                    .and_then(|v| serde_json::from_value::<RequestId>(v.clone()).ok());
                let error = McpError::Internal {
                    reason: e.to_string(),
                }
                .to_jsonrpc_error();
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(JsonRpcResponse::failure(id, error)),
                )
                    .into_response();
            }
        };

        match handle_message(&mut tool_router, message).await {
            None => StatusCode::NO_CONTENT.into_response(),
            Some(response) => (status_for(&response), Json(response)).into_response(),
        }
    }
    .instrument(span)
    .await
}

/// Invalid envelopes are client errors; everything else, including
/// protocol-level errors, travels as HTTP 200.
fn status_for(response: &JsonRpcResponse) -> StatusCode {
    match &response.error {
        Some(e) if e.code == error_codes::INVALID_REQUEST || e.code == error_codes::PARSE_ERROR => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::OK,
    }
}

async fn handle_mcp_get(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if query.get("action").map(String::as_str) != Some("health") {
        return Json(server_info()).into_response();
    }

    let ctx = context_from_headers(&headers);
    let mut health = json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "user": serde_json::to_value(&ctx).unwrap_or(Value::Null),
    });

    // Upstreams are only contacted when asked for.
    if wants_upstreams(&query) {
        let upstreams = match state.tool_router(ctx).await {
            Ok(mut tool_router) => {
                tool_router.list_tools().await;
                serde_json::to_value(tool_router.manager().upstream_status())
                    .unwrap_or(Value::Null)
            }
            Err(e) => {
                tracing::warn!(error = %e, "health check could not resolve upstreams");
                Value::Null
            }
        };
        health["upstreams"] = upstreams;
    }

    Json(health).into_response()
}

fn wants_upstreams(query: &HashMap<String, String>) -> bool {
    matches!(
        query.get("upstreams").map(String::as_str),
        Some("1" | "true")
    )
}

async fn handle_preflight() -> StatusCode {
    StatusCode::OK
}

fn server_info() -> Value {
    let gateway = Implementation::gateway();
    json!({
        "name": gateway.name,
        "version": gateway.version,
        "protocol": PROTOCOL_VERSION,
        "transport": "http",
        "capabilities": { "tools": {} },
        "endpoints": {
            "mcp": "POST /mcp",
            "info": "GET /mcp",
            "health": "GET /mcp?action=health",
            "upstreamHealth": "GET /mcp?action=health&upstreams=1",
            "probe": "POST /upstreams/probe",
        },
    })
}

#[derive(Debug, Deserialize)]
struct ProbeRequest {
    name: String,
    url: String,
}

async fn handle_probe(State(state): State<AppState>, Json(req): Json<ProbeRequest>) -> Response {
    tracing::info!(server = %req.name, url = %req.url, "probing upstream");
    let transport = Arc::new(HttpTransport::new(&req.name, &req.url, state.http.clone()));
    let tools = fetch_server_tools(&req.name, transport, state.timeouts).await;
    Json(json!({ "tools": tools })).into_response()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
