//! HTTP surface for the catalog pipeline.
//!
//! - `POST /mcp`                — one JSON-RPC request, same dispatcher as stdio
//! - `GET  /tools`              — MCP tool list with input schemas
//! - `GET  /tools/descriptions` — agent-facing descriptions with usage context
//! - `GET  /`                   — service index

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use productmaster_mcp::ProductMasterMcpServer;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Clone)]
pub struct ApiState {
    mcp: ProductMasterMcpServer,
}

#[derive(Debug, Serialize)]
pub struct ServiceIndex {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

pub fn router(mcp: ProductMasterMcpServer) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/mcp", post(mcp_request))
        .route("/tools", get(list_tools))
        .route("/tools/descriptions", get(tool_descriptions))
        .with_state(ApiState { mcp })
}

async fn index() -> Json<ServiceIndex> {
    Json(ServiceIndex {
        service: "productmaster-server",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec!["POST /mcp", "GET /tools", "GET /tools/descriptions", "GET /health"],
    })
}

/// The body is taken as text so malformed JSON still gets a JSON-RPC parse
/// error rather than an extractor rejection.
async fn mcp_request(State(state): State<ApiState>, body: String) -> Response {
    match state.mcp.handle_line(&body).await {
        Some(response) => Json(response).into_response(),
        None => {
            debug!(event_name = "http.mcp.notification", "notification accepted");
            StatusCode::ACCEPTED.into_response()
        }
    }
}

async fn list_tools(State(state): State<ApiState>) -> Json<Value> {
    Json(state.mcp.list_tools())
}

async fn tool_descriptions(State(state): State<ApiState>) -> Json<Value> {
    let tools: Vec<Value> =
        state.mcp.registry().iter().map(|tool| tool.describe_for_agent()).collect();
    Json(json!({ "tools": tools }))
}
