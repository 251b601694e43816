//! Typed errors for tool-provider operations

use crate::mcp::types::codes;
use crate::mcp::McpError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool provider unavailable: {0}")]
    Unavailable(String),

    #[error("Tool provider rejected the credential: {0}")]
    AuthRejected(String),

    #[error("Tool execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolError {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ToolError::AuthRejected(_))
    }

    /// Classify a failure while opening a session
    pub fn from_connect(err: McpError) -> Self {
        let message = err.to_string();
        if mentions_auth(&message) {
            ToolError::AuthRejected(message)
        } else {
            ToolError::Unavailable(message)
        }
    }

    /// Classify a failed operation on an open session
    pub fn from_mcp(err: McpError, tool: Option<&str>) -> Self {
        let rpc = match err {
            McpError::Rpc(rpc) => rpc,
            other => return ToolError::Unavailable(other.to_string()),
        };

        let lower = rpc.message.to_lowercase();
        if rpc.code == codes::METHOD_NOT_FOUND
            || lower.contains("unknown tool")
            || lower.contains("tool not found")
        {
            return ToolError::NotFound(tool.map(str::to_string).unwrap_or(rpc.message));
        }
        if mentions_auth(&rpc.message) {
            return ToolError::AuthRejected(rpc.message);
        }
        if rpc.code == codes::INVALID_PARAMS {
            return ToolError::InvalidArguments(rpc.message);
        }
        ToolError::ExecutionFailed(rpc.message)
    }
}

/// Whether a provider message describes a refused credential
pub(crate) fn mentions_auth(text: &str) -> bool {
    let lower = text.to_lowercase();
    ["401", "403", "unauthorized", "forbidden", "invalid token", "authentication"]
        .iter()
        .any(|needle| lower.contains(needle))
}
