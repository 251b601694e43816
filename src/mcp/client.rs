//! MCP client session (async).
//!
//! A session performs the handshake on an open transport, serves one or a
//! few operations, and is closed by its owner.

use super::error::McpError;
use super::transport::McpTransport;
use super::types::{
    Implementation, InitializeResult, ListToolsResult, McpToolDef, McpToolResult,
    ServerCapabilities, PROTOCOL_VERSION,
};
use serde_json::{json, Value};

/// Upper bound on `tools/list` pages followed in one listing
const MAX_TOOL_PAGES: usize = 32;

pub struct McpSession {
    transport: McpTransport,
    capabilities: ServerCapabilities,
    server_info: Implementation,
}

impl McpSession {
    /// Run the `initialize` handshake on an open transport
    pub async fn connect(transport: McpTransport) -> Result<Self, McpError> {
        let result = transport
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION")
                    }
                })),
            )
            .await;

        let parsed = result.and_then(|v| {
            serde_json::from_value::<InitializeResult>(v).map_err(McpError::from)
        });
        let init = match parsed {
            Ok(init) => init,
            Err(e) => {
                let _ = transport.close().await;
                return Err(e);
            }
        };

        if init.protocol_version != PROTOCOL_VERSION {
            tracing::debug!(
                "MCP server {} negotiated protocol {}",
                init.server_info.name,
                init.protocol_version
            );
        }

        if let Err(e) = transport.notify("notifications/initialized", None).await {
            let _ = transport.close().await;
            return Err(e);
        }

        tracing::debug!(
            "MCP session open: {} {}",
            init.server_info.name,
            init.server_info.version
        );

        Ok(Self {
            transport,
            capabilities: init.capabilities,
            server_info: init.server_info,
        })
    }

    pub fn server_info(&self) -> &Implementation {
        &self.server_info
    }

    pub fn capabilities(&self) -> &ServerCapabilities {
        &self.capabilities
    }

    /// List every tool the server exposes, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<McpToolDef>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
            let page: ListToolsResult =
                serde_json::from_value(self.transport.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        tracing::warn!(
            "MCP server {} kept paginating tools/list; stopping after {} pages",
            self.server_info.name,
            MAX_TOOL_PAGES
        );
        Ok(tools)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, McpError> {
        let result = self
            .transport
            .request(
                "tools/call",
                Some(json!({
                    "name": name,
                    "arguments": arguments
                })),
            )
            .await?;

        Ok(serde_json::from_value(result)?)
    }

    /// Close the session and release the server
    pub async fn close(self) -> Result<(), McpError> {
        self.transport.close().await
    }
}
