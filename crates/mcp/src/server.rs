//! MCP Server Implementation
//!
//! Dispatches JSON-RPC requests to the query pipeline.

use std::sync::Arc;

use productmaster_agent::{GuardrailPolicy, QueryPipeline, ToolRegistry};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::protocol::{
    Implementation, InitializeResult, JsonRpcRequest, McpResponse, ServerCapabilities,
    ToolCallParams, ToolsCapability, JSONRPC_VERSION, PROTOCOL_VERSION,
};
use crate::{McpError, McpResult};

const SERVER_NAME: &str = "productmaster-mcp";

/// Main MCP server for ProductMaster
#[derive(Clone)]
pub struct ProductMasterMcpServer {
    pipeline: Arc<QueryPipeline>,
    registry: ToolRegistry,
    guardrails: GuardrailPolicy,
}

impl ProductMasterMcpServer {
    pub fn new(
        pipeline: Arc<QueryPipeline>,
        registry: ToolRegistry,
        guardrails: GuardrailPolicy,
    ) -> Self {
        Self { pipeline, registry, guardrails }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run the server with stdio transport
    pub async fn run_stdio(&self) -> std::io::Result<()> {
        info!(event_name = "mcp.stdio.start", "starting MCP server with stdio transport");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await?;
        info!(event_name = "mcp.stdio.stopped", "MCP server shutdown complete");
        Ok(())
    }

    /// Newline-delimited JSON-RPC until the reader reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut payload = match response.to_json() {
                Ok(payload) => payload,
                Err(error) => {
                    let fallback = McpResponse::failure(
                        response.id().clone(),
                        McpError::Internal(error.to_string()).to_rpc_error(),
                    );
                    fallback.to_json().map_err(std::io::Error::other)?
                }
            };
            payload.push('\n');
            writer.write_all(payload.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    }

    /// Parses one raw message. Returns `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<McpResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle(request).await,
            Err(error) => {
                warn!(event_name = "mcp.request.unparseable", error = %error, "dropping malformed request");
                Some(McpResponse::failure(
                    Value::Null,
                    McpError::Parse(error.to_string()).to_rpc_error(),
                ))
            }
        }
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<McpResponse> {
        let Some(id) = request.id.clone() else {
            debug!(event_name = "mcp.notification", method = %request.method, "notification received");
            return None;
        };

        if request.jsonrpc != JSONRPC_VERSION {
            let error = McpError::InvalidRequest(format!(
                "unsupported jsonrpc version `{}`",
                request.jsonrpc
            ));
            return Some(McpResponse::failure(id, error.to_rpc_error()));
        }

        let outcome = match request.method.as_str() {
            "initialize" => self.initialize().map(|result| McpResponse::reply(id.clone(), result)),
            "ping" => Ok(McpResponse::reply(id.clone(), json!({}))),
            "tools/list" => Ok(McpResponse::reply(id.clone(), self.list_tools())),
            "tools/call" => self.call_tool(id.clone(), request.params).await,
            other => Err(McpError::MethodNotFound(other.to_string())),
        };

        Some(outcome.unwrap_or_else(|error| {
            warn!(
                event_name = "mcp.request.rejected",
                method = %request.method,
                code = error.error_code(),
                error = %error,
                "request rejected"
            );
            McpResponse::failure(id, error.to_rpc_error())
        }))
    }

    fn initialize(&self) -> McpResult<Value> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: ServerCapabilities { tools: ToolsCapability { list_changed: false } },
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            instructions: Some(
                "ProductMaster MCP Server - natural-language search over the financial \
                 product catalog. Pass the user's request unchanged as `text_input`."
                    .to_string(),
            ),
        };
        serde_json::to_value(result).map_err(|error| McpError::Internal(error.to_string()))
    }

    pub fn list_tools(&self) -> Value {
        let max_limit = self.guardrails.max_limit;
        let tools: Vec<Value> = self.registry.iter().map(|tool| tool.describe(max_limit)).collect();
        json!({ "tools": tools })
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> McpResult<McpResponse> {
        let params = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
        let params: ToolCallParams = serde_json::from_value(params)
            .map_err(|error| McpError::InvalidParams(error.to_string()))?;

        let tool = self
            .registry
            .get(&params.name)
            .ok_or_else(|| McpError::UnknownTool(params.name.clone()))?;
        let request = self.guardrails.evaluate(tool.name, &params.arguments)?;

        info!(event_name = "mcp.tool.call", tool = tool.name, "running tool");
        let envelope = self.pipeline.run_request(request).await;
        Ok(McpResponse::tool_call(id, envelope))
    }
}
