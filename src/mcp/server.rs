//! In-process MCP server.
//!
//! Serves an [`McpHandler`] over newline-delimited JSON-RPC on any pair of
//! byte streams. [`spawn_in_process`] wires a handler to an in-memory duplex
//! and hands back the client end as an [`McpTransport`].

use super::error::McpError;
use super::transport::McpTransport;
use super::types::{
    codes, Implementation, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, McpToolDef, McpToolResult, ServerCapabilities, ToolsCapability,
    PROTOCOL_VERSION,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Buffer size of each direction of the in-memory duplex
const DUPLEX_BUFFER: usize = 64 * 1024;

/// Tool host answering MCP requests
#[async_trait]
pub trait McpHandler: Send + Sync {
    fn server_info(&self) -> Implementation;

    async fn list_tools(&self) -> Vec<McpToolDef>;

    /// Execute a tool.
    ///
    /// Unknown tools and malformed arguments are protocol errors (`Err`);
    /// failures of the tool itself are `Ok` results with `is_error` set.
    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<McpToolResult, JsonRpcError>;
}

/// Start `handler` on an in-memory stream and return the client transport.
///
/// The server task ends when the client closes its side.
pub fn spawn_in_process(handler: Arc<dyn McpHandler>, timeout: Duration) -> McpTransport {
    let (client, server) = tokio::io::duplex(DUPLEX_BUFFER);
    let (server_read, server_write) = tokio::io::split(server);

    tokio::spawn(async move {
        if let Err(e) = serve(handler, server_read, server_write).await {
            tracing::debug!("In-process MCP server stopped: {}", e);
        }
    });

    let (client_read, client_write) = tokio::io::split(client);
    McpTransport::from_streams(client_read, client_write, timeout)
}

/// Serve requests until the reader reaches EOF
pub async fn serve<R, W>(
    handler: Arc<dyn McpHandler>,
    reader: R,
    mut writer: W,
) -> Result<(), McpError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => dispatch(handler.as_ref(), request).await,
            Err(e) => Some(JsonRpcResponse::failure(
                Value::Null,
                JsonRpcError::new(codes::PARSE_ERROR, format!("Parse error: {}", e)),
            )),
        };

        if let Some(response) = response {
            let mut out = serde_json::to_string(&response)?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
    }

    Ok(())
}

async fn dispatch(handler: &dyn McpHandler, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = match request.id {
        Some(id) => id,
        None => {
            tracing::debug!("MCP server got notification: {}", request.method);
            return None;
        }
    };

    let result = match request.method.as_str() {
        "initialize" => to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            server_info: handler.server_info(),
        }),
        "ping" => Ok(Value::Object(Default::default())),
        "tools/list" => to_value(ListToolsResult {
            tools: handler.list_tools().await,
            next_cursor: None,
        }),
        "tools/call" => call_tool(handler, request.params).await,
        other => Err(JsonRpcError::method_not_found(other)),
    };

    Some(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::failure(id, error),
    })
}

async fn call_tool(handler: &dyn McpHandler, params: Option<Value>) -> Result<Value, JsonRpcError> {
    let params = params.unwrap_or(Value::Null);
    let name = params
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::invalid_params("Missing tool name"))?;

    let arguments = match params.get("arguments") {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(args @ Value::Object(_)) => args.clone(),
        Some(_) => {
            return Err(JsonRpcError::invalid_params(
                "Tool arguments must be an object",
            ))
        }
    };

    to_value(handler.call_tool(name, arguments).await?)
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::McpSession;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait]
    impl McpHandler for EchoHandler {
        fn server_info(&self) -> Implementation {
            Implementation {
                name: "echo".to_string(),
                version: "0.0.1".to_string(),
            }
        }

        async fn list_tools(&self) -> Vec<McpToolDef> {
            vec![McpToolDef {
                name: "echo".to_string(),
                description: "Echo the arguments".to_string(),
                input_schema: json!({"type": "object"}),
            }]
        }

        async fn call_tool(
            &self,
            name: &str,
            arguments: Value,
        ) -> Result<McpToolResult, JsonRpcError> {
            match name {
                "echo" => Ok(McpToolResult::text(arguments.to_string())),
                "fail" => Ok(McpToolResult::error("it broke")),
                other => Err(JsonRpcError::new(
                    codes::METHOD_NOT_FOUND,
                    format!("Unknown tool: {}", other),
                )),
            }
        }
    }

    async fn session() -> McpSession {
        let transport = spawn_in_process(Arc::new(EchoHandler), Duration::from_secs(5));
        McpSession::connect(transport).await.unwrap()
    }

    #[tokio::test]
    async fn test_handshake_and_list() {
        let session = session().await;
        assert_eq!(session.server_info().name, "echo");
        assert!(session.capabilities().tools.is_some());

        let tools = session.list_tools().await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "echo");
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_call_tool_outcomes() {
        let session = session().await;

        let ok = session.call_tool("echo", json!({"a": 1})).await.unwrap();
        assert!(!ok.is_error);
        assert_eq!(ok.to_text(), r#"{"a":1}"#);

        let failed = session.call_tool("fail", json!({})).await.unwrap();
        assert!(failed.is_error);

        let err = session.call_tool("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, McpError::Rpc(ref e) if e.code == codes::METHOD_NOT_FOUND));

        let err = session.call_tool("echo", json!("not an object")).await.unwrap_err();
        assert!(matches!(err, McpError::Rpc(ref e) if e.code == codes::INVALID_PARAMS));

        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_method_and_bad_json() {
        let (client, server) = tokio::io::duplex(4096);
        let (server_read, server_write) = tokio::io::split(server);
        let task = tokio::spawn(serve(Arc::new(EchoHandler), server_read, server_write));

        let (client_read, mut client_write) = tokio::io::split(client);
        client_write
            .write_all(b"this is not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"resources/list\"}\n")
            .await
            .unwrap();
        client_write.shutdown().await.unwrap();

        let mut lines = BufReader::new(client_read).lines();
        let first: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(first["error"]["code"], codes::PARSE_ERROR);

        let second: Value =
            serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(second["id"], 7);
        assert_eq!(second["error"]["code"], codes::METHOD_NOT_FOUND);

        task.await.unwrap().unwrap();
    }
}
