//! JSON-RPC 2.0 and MCP wire types.
//!
//! Responses are serialized straight to text. The tool-call body flattens the
//! pipeline [`Envelope`] next to `jsonrpc`/`id`, and its field order
//! (`result`, `error`, `debug_response`) is part of the contract, so these
//! types must never be routed through `serde_json::Value` on the way out.

use productmaster_core::envelope::Envelope;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: String,
    /// Absent for notifications. An explicit `null` is still a request id.
    #[serde(default, deserialize_with = "present_id")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse<T> {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(flatten)]
    pub payload: T,
}

impl<T> JsonRpcResponse<T> {
    pub fn new(id: Value, payload: T) -> Self {
        Self { jsonrpc: JSONRPC_VERSION, id, payload }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Reply {
    pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct Failure {
    pub error: JsonRpcError,
}

/// Everything the dispatcher can answer with.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum McpResponse {
    Reply(JsonRpcResponse<Reply>),
    ToolCall(JsonRpcResponse<Envelope>),
    Failure(JsonRpcResponse<Failure>),
}

impl McpResponse {
    pub fn reply(id: Value, result: Value) -> Self {
        Self::Reply(JsonRpcResponse::new(id, Reply { result }))
    }

    pub fn tool_call(id: Value, envelope: Envelope) -> Self {
        Self::ToolCall(JsonRpcResponse::new(id, envelope))
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self::Failure(JsonRpcResponse::new(id, Failure { error }))
    }

    pub fn id(&self) -> &Value {
        match self {
            Self::Reply(response) => &response.id,
            Self::ToolCall(response) => &response.id,
            Self::Failure(response) => &response.id,
        }
    }

    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::ToolCall(response) => Some(&response.payload),
            _ => None,
        }
    }

    pub fn rpc_error(&self) -> Option<&JsonRpcError> {
        match self {
            Self::Failure(response) => Some(&response.payload.error),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: &'static str,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    pub tools: ToolsCapability,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}
