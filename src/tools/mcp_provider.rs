//! Tool provider backed by an MCP server
//!
//! Every operation opens its own session through the launcher and closes it
//! before returning, whether the operation succeeded or not.

use super::airtable::AirtableClient;
use super::error::ToolError;
use super::launcher::{InProcessLauncher, SessionLauncher, StdioLauncher};
use super::ToolProvider;
use crate::config::{CredentialCheck, ToolProviderConfig, ToolTransport};
use crate::llm::ToolDefinition;
use crate::mcp::{McpSession, McpToolDef};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

/// How `verify_credentials` checks the token
pub enum CredentialProbe {
    /// Call a read-only tool with `{}`
    McpTool(String),
    /// Ask the REST metadata API directly
    RestMetadata(AirtableClient),
}

pub struct McpToolProvider {
    launcher: Arc<dyn SessionLauncher>,
    probe: CredentialProbe,
}

impl McpToolProvider {
    pub fn new(launcher: Arc<dyn SessionLauncher>, probe: CredentialProbe) -> Self {
        Self { launcher, probe }
    }

    pub fn from_config(config: &ToolProviderConfig) -> Self {
        let launcher: Arc<dyn SessionLauncher> = match config.transport {
            ToolTransport::Stdio => Arc::new(StdioLauncher::from_config(config)),
            ToolTransport::InProcess => Arc::new(InProcessLauncher::airtable(
                &config.api_base,
                config.request_timeout(),
            )),
        };

        let probe = match config.credential_check {
            CredentialCheck::McpTool => CredentialProbe::McpTool(config.probe_tool.clone()),
            CredentialCheck::RestMetadata => {
                CredentialProbe::RestMetadata(AirtableClient::new(&config.api_base))
            }
        };

        Self::new(launcher, probe)
    }

    async fn open(&self, credential: &str) -> Result<McpSession, ToolError> {
        let transport = self
            .launcher
            .launch(credential)
            .await
            .map_err(ToolError::from_connect)?;
        McpSession::connect(transport)
            .await
            .map_err(ToolError::from_connect)
    }

    async fn close(session: McpSession) {
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close MCP session: {}", e);
        }
    }
}

impl From<McpToolDef> for ToolDefinition {
    fn from(def: McpToolDef) -> Self {
        // Function calling needs a schema even for tools that declare none
        let parameters = if def.input_schema.is_null() {
            json!({"type": "object", "properties": {}})
        } else {
            def.input_schema
        };

        ToolDefinition {
            name: def.name,
            description: def.description,
            parameters,
        }
    }
}

#[async_trait]
impl ToolProvider for McpToolProvider {
    async fn list_tools(&self, credential: &str) -> Result<Vec<ToolDefinition>, ToolError> {
        let session = self.open(credential).await?;
        let result = session.list_tools().await;
        Self::close(session).await;

        let tools = result.map_err(|e| ToolError::from_mcp(e, None))?;
        tracing::debug!("Tool provider exposes {} tools", tools.len());
        Ok(tools.into_iter().map(ToolDefinition::from).collect())
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        credential: &str,
    ) -> Result<String, ToolError> {
        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments(format!(
                "arguments for {} must be a JSON object, got: {}",
                name,
                match arguments {
                    Value::String(raw) => raw.clone(),
                    other => other.to_string(),
                }
            )));
        }

        let session = self.open(credential).await?;
        let result = session.call_tool(name, arguments.clone()).await;
        Self::close(session).await;

        let result = result.map_err(|e| ToolError::from_mcp(e, Some(name)))?;
        if result.is_error {
            return Err(ToolError::ExecutionFailed(result.to_text()));
        }

        serde_json::to_string(&result.content)
            .map_err(|e| ToolError::ExecutionFailed(e.to_string()))
    }

    async fn verify_credentials(&self, credential: &str) -> Result<(), ToolError> {
        match &self.probe {
            CredentialProbe::McpTool(tool) => {
                self.invoke(tool, &json!({}), credential).await.map(|_| ())
            }
            CredentialProbe::RestMetadata(client) => {
                client
                    .list_bases(credential)
                    .await
                    .map_err(|e| {
                        if e.is_auth_error() {
                            ToolError::AuthRejected(e.to_string())
                        } else {
                            ToolError::Unavailable(e.to_string())
                        }
                    })?;
                Ok(())
            }
        }
    }
}
