//! MCP protocol types and data structures.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Protocol revision spoken by both the client and the in-process server
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error codes used by MCP
pub mod codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
}

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(Value::from(id)),
            method: method.to_string(),
            params,
        }
    }

    pub fn notification(method: &str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.to_string(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// JSON-RPC error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(codes::METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(codes::INVALID_PARAMS, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL_ERROR, message)
    }
}

/// Tool definition from MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolDef {
    /// Tool name
    pub name: String,
    /// Tool description
    #[serde(default)]
    pub description: String,
    /// JSON Schema for input parameters
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of `tools/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpToolDef>,
    #[serde(
        default,
        rename = "nextCursor",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_cursor: Option<String>,
}

/// Result of a tool call
///
/// Content items are kept as the server sent them, so item types and fields
/// this crate does not model survive a round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Content returned by the tool
    #[serde(default)]
    pub content: Vec<Value>,
    /// Whether the call resulted in an error
    #[serde(default, rename = "isError")]
    pub is_error: bool,
}

/// Typed view of the content items this crate renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McpContent {
    /// Text content
    #[serde(rename = "text")]
    Text { text: String },
    /// Image content (base64)
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Resource reference
    #[serde(rename = "resource")]
    Resource { resource: Value },
}

impl McpContent {
    /// Human-readable rendering of one raw content item
    fn render(item: &Value) -> String {
        match serde_json::from_value::<McpContent>(item.clone()) {
            Ok(McpContent::Text { text }) => text,
            Ok(McpContent::Image { .. }) => "[Image]".to_string(),
            Ok(McpContent::Resource { resource }) => format!(
                "[Resource: {}]",
                resource.get("uri").and_then(Value::as_str).unwrap_or("?")
            ),
            Err(_) => match item.get("type").and_then(Value::as_str) {
                Some(kind) => format!("[{}]", kind),
                None => item.to_string(),
            },
        }
    }
}

impl McpToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            content: vec![json!({"type": "text", "text": text})],
            is_error: false,
        }
    }

    /// Tool-level failure reported inside a successful JSON-RPC response
    pub fn error(text: impl Into<String>) -> Self {
        let text: String = text.into();
        Self {
            content: vec![json!({"type": "text", "text": text})],
            is_error: true,
        }
    }

    /// Convert to string representation
    pub fn to_text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Server capabilities returned during initialization
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// Whether server supports tools
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

/// Tools capability details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolsCapability {
    /// Whether tool list can change
    #[serde(default, rename = "listChanged")]
    pub list_changed: bool,
}

/// Name and version of one side of a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// Result of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_def_uses_camel_case_schema() {
        let def: McpToolDef = serde_json::from_value(json!({
            "name": "list_bases",
            "inputSchema": {"type": "object", "properties": {}}
        }))
        .unwrap();
        assert_eq!(def.description, "");
        assert_eq!(def.input_schema["type"], "object");
    }

    #[test]
    fn test_tool_result_round_trip() {
        let json = r#"{"content":[{"type":"text","text":"[{\"id\":\"app1\"}]"}],"isError":false}"#;
        let result: McpToolResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(result.to_text(), "[{\"id\":\"app1\"}]");

        let content = serde_json::to_value(&result.content).unwrap();
        assert_eq!(content, json!([{"type": "text", "text": "[{\"id\":\"app1\"}]"}]));
    }

    #[test]
    fn test_tool_result_keeps_unmodelled_content() {
        let result: McpToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "ok", "annotations": {"audience": ["user"]}},
                {"type": "resource_link", "uri": "airtable://appCRM", "name": "CRM"},
                {"type": "audio", "data": "AAAA", "mimeType": "audio/wav"}
            ]
        }))
        .unwrap();

        assert_eq!(result.content[0]["annotations"]["audience"][0], "user");
        assert_eq!(result.content[1]["uri"], "airtable://appCRM");
        assert_eq!(result.to_text(), "ok\n[resource_link]\n[audio]");
    }

    #[test]
    fn test_notification_has_no_id() {
        let n = JsonRpcRequest::notification("notifications/initialized", None);
        assert!(n.is_notification());
        let line = serde_json::to_string(&n).unwrap();
        assert!(!line.contains("\"id\""));
    }
}
