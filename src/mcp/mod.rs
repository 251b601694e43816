//! MCP (Model Context Protocol) client and in-process server.
//!
//! Sessions are short-lived: open, handshake, one operation, close.

pub mod client;
pub mod error;
pub mod server;
pub mod transport;
pub mod types;

// Re-export main types
pub use client::McpSession;
pub use error::McpError;
pub use server::{spawn_in_process, McpHandler};
pub use transport::McpTransport;
pub use types::{Implementation, JsonRpcError, McpContent, McpToolDef, McpToolResult};
