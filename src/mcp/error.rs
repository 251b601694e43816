//! MCP error types.

use super::types::JsonRpcError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP server closed the connection")]
    Closed,

    #[error("MCP request '{method}' timed out after {secs}s")]
    Timeout { method: String, secs: u64 },

    #[error("MCP error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    #[error("Invalid MCP message: {0}")]
    Protocol(String),
}

impl From<serde_json::Error> for McpError {
    fn from(e: serde_json::Error) -> Self {
        McpError::Protocol(e.to_string())
    }
}
