//! ProductMaster MCP (Model Context Protocol) Server
//!
//! Exposes the catalog operations (`search_products`,
//! `filter_products_by_risk_and_type`, `get_product_details`,
//! `search_products_by_name_fuzzy`) as MCP tools.
//! Every tool call runs the query pipeline and answers with the envelope
//! plus its `debug_response` trace.
//!
//! ## Architecture
//!
//! - `protocol`: JSON-RPC 2.0 / MCP wire types
//! - `server`: `ProductMasterMcpServer`, the method dispatcher and stdio loop
//! - `bootstrap`: config → pool → migrations → prompt store → model → pipeline
//!
//! ## Example Usage
//!
//! ```no_run
//! use productmaster_core::config::LoadOptions;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = productmaster_mcp::bootstrap::bootstrap(LoadOptions::default()).await?;
//!     app.mcp.run_stdio().await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod protocol;
mod server;

pub use bootstrap::{Application, BootstrapError};
pub use protocol::{JsonRpcError, JsonRpcRequest, McpResponse};
pub use server::ProductMasterMcpServer;

use productmaster_core::errors::ValidationError;
use thiserror::Error;

/// Errors answered with a JSON-RPC error object instead of an envelope.
#[derive(Error, Debug)]
pub enum McpError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("invalid arguments: {0}")]
    Validation(#[from] ValidationError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::Parse(_) => -32700,
            McpError::InvalidRequest(_) => -32600,
            McpError::MethodNotFound(_) => -32601,
            McpError::UnknownTool(_) | McpError::InvalidParams(_) | McpError::Validation(_) => {
                -32602
            }
            McpError::Internal(_) => -32603,
        }
    }

    pub fn to_rpc_error(&self) -> JsonRpcError {
        JsonRpcError { code: self.error_code(), message: self.to_string(), data: None }
    }
}

/// Result type for MCP operations
pub type McpResult<T> = Result<T, McpError>;
