//! Airtable REST client and the built-in Airtable tool server
//!
//! The client backs two things: the REST credential probe used by
//! `/validate-keys`, and [`AirtableMcpHandler`], an MCP tool host that runs
//! in-process instead of spawning `airtable-mcp-server`.

use crate::mcp::types::codes;
use crate::mcp::{Implementation, JsonRpcError, McpHandler, McpToolDef, McpToolResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Airtable REST API root
pub const AIRTABLE_API_BASE: &str = "https://api.airtable.com/v0";

/// Upper bound on pages followed when listing bases
const MAX_PAGES: usize = 50;

#[derive(Debug, Error)]
pub enum AirtableError {
    #[error("Airtable rejected the token ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Airtable API error ({status}): {body}")]
    Http { status: u16, body: String },

    #[error("Airtable request failed: {0}")]
    Network(String),

    #[error("Invalid Airtable URL: {0}")]
    Url(String),
}

impl AirtableError {
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AirtableError::Unauthorized { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Base {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permission_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BasesPage {
    #[serde(default)]
    bases: Vec<Base>,
    #[serde(default)]
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TablesPage {
    #[serde(default)]
    tables: Vec<Value>,
}

/// Thin client over the Airtable REST API; the token is passed per call
#[derive(Clone)]
pub struct AirtableClient {
    client: reqwest::Client,
    base_url: String,
}

impl AirtableClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AirtableError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| AirtableError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| AirtableError::Url(self.base_url.clone()))?
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, token: &str) -> Result<Value, AirtableError> {
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AirtableError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AirtableError::Unauthorized {
                    status: status.as_u16(),
                    body,
                },
                code => AirtableError::Http { status: code, body },
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AirtableError::Network(e.to_string()))
    }

    /// Every base the token can see
    pub async fn list_bases(&self, token: &str) -> Result<Vec<Base>, AirtableError> {
        let url = self.url(&["meta", "bases"])?;
        let mut bases = Vec::new();
        let mut offset: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut request = self.client.get(url.clone());
            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset)]);
            }

            let page: BasesPage = serde_json::from_value(self.send(request, token).await?)
                .map_err(|e| AirtableError::Network(e.to_string()))?;
            bases.extend(page.bases);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(bases)
    }

    /// Table schemas (fields and views) of one base
    pub async fn list_tables(&self, token: &str, base_id: &str) -> Result<Vec<Value>, AirtableError> {
        let url = self.url(&["meta", "bases", base_id, "tables"])?;
        let page: TablesPage = serde_json::from_value(self.send(self.client.get(url), token).await?)
            .map_err(|e| AirtableError::Network(e.to_string()))?;
        Ok(page.tables)
    }

    pub async fn list_records(
        &self,
        token: &str,
        base_id: &str,
        table: &str,
        max_records: u64,
    ) -> Result<Value, AirtableError> {
        let url = self.url(&[base_id, table])?;
        let request = self
            .client
            .get(url)
            .query(&[("maxRecords", max_records.to_string())]);
        let body = self.send(request, token).await?;
        Ok(body.get("records").cloned().unwrap_or_else(|| json!([])))
    }

    pub async fn create_record(
        &self,
        token: &str,
        base_id: &str,
        table: &str,
        fields: &Value,
    ) -> Result<Value, AirtableError> {
        let url = self.url(&[base_id, table])?;
        let request = self.client.post(url).json(&json!({ "fields": fields }));
        self.send(request, token).await
    }
}

/// MCP tool host backed by the Airtable REST API, bound to one token
pub struct AirtableMcpHandler {
    client: AirtableClient,
    token: String,
}

impl AirtableMcpHandler {
    pub fn new(client: AirtableClient, token: impl Into<String>) -> Self {
        Self {
            client,
            token: token.into(),
        }
    }

    async fn run(&self, name: &str, args: &Value) -> Result<Value, ToolCallError> {
        match name {
            "list_bases" => Ok(serde_json::to_value(self.client.list_bases(&self.token).await?)
                .unwrap_or_default()),
            "list_tables" => {
                let base_id = required_str(args, "baseId")?;
                let tables = self.client.list_tables(&self.token, base_id).await?;
                Ok(Value::Array(tables))
            }
            "describe_table" => {
                let base_id = required_str(args, "baseId")?;
                let table_id = required_str(args, "tableId")?;
                let tables = self.client.list_tables(&self.token, base_id).await?;
                tables
                    .into_iter()
                    .find(|t| {
                        t.get("id").and_then(Value::as_str) == Some(table_id)
                            || t.get("name").and_then(Value::as_str) == Some(table_id)
                    })
                    .ok_or_else(|| {
                        ToolCallError::Failed(format!(
                            "Table {} not found in base {}",
                            table_id, base_id
                        ))
                    })
            }
            "list_records" => {
                let base_id = required_str(args, "baseId")?;
                let table_id = required_str(args, "tableId")?;
                let max = args
                    .get("maxRecords")
                    .and_then(Value::as_u64)
                    .unwrap_or(100)
                    .clamp(1, 100);
                Ok(self
                    .client
                    .list_records(&self.token, base_id, table_id, max)
                    .await?)
            }
            "create_record" => {
                let base_id = required_str(args, "baseId")?;
                let table_id = required_str(args, "tableId")?;
                let fields = match args.get("fields") {
                    Some(fields @ Value::Object(_)) => fields,
                    _ => {
                        return Err(ToolCallError::Params(
                            "create_record requires a \"fields\" object".to_string(),
                        ))
                    }
                };
                Ok(self
                    .client
                    .create_record(&self.token, base_id, table_id, fields)
                    .await?)
            }
            other => Err(ToolCallError::Unknown(other.to_string())),
        }
    }
}

enum ToolCallError {
    Unknown(String),
    Params(String),
    Failed(String),
}

impl From<AirtableError> for ToolCallError {
    fn from(e: AirtableError) -> Self {
        ToolCallError::Failed(e.to_string())
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolCallError> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolCallError::Params(format!("Missing required string parameter: {}", key)))
}

fn object_schema(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn tool(name: &str, description: &str, input_schema: Value) -> McpToolDef {
    McpToolDef {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

#[async_trait]
impl McpHandler for AirtableMcpHandler {
    fn server_info(&self) -> Implementation {
        Implementation {
            name: "airchat-airtable".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    async fn list_tools(&self) -> Vec<McpToolDef> {
        let base = json!({"type": "string", "description": "ID of the base"});
        let table = json!({"type": "string", "description": "ID or name of the table"});

        vec![
            tool(
                "list_bases",
                "List all accessible Airtable bases",
                object_schema(json!({}), &[]),
            ),
            tool(
                "list_tables",
                "List the tables in a base, with their fields",
                object_schema(json!({ "baseId": base }), &["baseId"]),
            ),
            tool(
                "describe_table",
                "Describe one table: its fields and views",
                object_schema(json!({ "baseId": base, "tableId": table }), &["baseId", "tableId"]),
            ),
            tool(
                "list_records",
                "List records from a table",
                object_schema(
                    json!({
                        "baseId": base,
                        "tableId": table,
                        "maxRecords": {"type": "number", "description": "At most 100"}
                    }),
                    &["baseId", "tableId"],
                ),
            ),
            tool(
                "create_record",
                "Create a record in a table",
                object_schema(
                    json!({
                        "baseId": base,
                        "tableId": table,
                        "fields": {
                            "type": "object",
                            "description": "Field values keyed by field name",
                            "additionalProperties": true
                        }
                    }),
                    &["baseId", "tableId", "fields"],
                ),
            ),
        ]
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<McpToolResult, JsonRpcError> {
        tracing::debug!("Airtable tool call: {}", name);

        match self.run(name, &arguments).await {
            Ok(value) => Ok(McpToolResult::text(value.to_string())),
            Err(ToolCallError::Unknown(name)) => Err(JsonRpcError::new(
                codes::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", name),
            )),
            Err(ToolCallError::Params(msg)) => Err(JsonRpcError::invalid_params(msg)),
            Err(ToolCallError::Failed(msg)) => Ok(McpToolResult::error(msg)),
        }
    }
}
