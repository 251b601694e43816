//! Ways of opening a fresh MCP transport scoped to one credential

use super::airtable::{AirtableClient, AirtableMcpHandler};
use crate::config::ToolProviderConfig;
use crate::mcp::transport::expand_env_vars;
use crate::mcp::{spawn_in_process, McpError, McpHandler, McpTransport};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Open a transport whose server acts with `credential`
    async fn launch(&self, credential: &str) -> Result<McpTransport, McpError>;
}

/// Spawns the tool server as a child process per session
pub struct StdioLauncher {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    api_key_env: String,
    timeout: Duration,
}

impl StdioLauncher {
    pub fn new(command: &str, args: Vec<String>, api_key_env: &str, timeout: Duration) -> Self {
        Self {
            command: command.to_string(),
            args,
            env: HashMap::new(),
            api_key_env: api_key_env.to_string(),
            timeout,
        }
    }

    /// Extra environment; `${VAR}` references are expanded now
    pub fn with_env(mut self, env: &HashMap<String, String>) -> Self {
        self.env = env
            .iter()
            .map(|(k, v)| (k.clone(), expand_env_vars(v)))
            .collect();
        self
    }

    pub fn from_config(config: &ToolProviderConfig) -> Self {
        Self::new(
            &config.command,
            config.args.clone(),
            &config.api_key_env,
            config.request_timeout(),
        )
        .with_env(&config.env)
    }
}

#[async_trait]
impl SessionLauncher for StdioLauncher {
    async fn launch(&self, credential: &str) -> Result<McpTransport, McpError> {
        let mut env = self.env.clone();
        env.insert(self.api_key_env.clone(), credential.to_string());
        McpTransport::spawn(&self.command, &self.args, &env, self.timeout).await
    }
}

type HandlerFactory = dyn Fn(&str) -> Arc<dyn McpHandler> + Send + Sync;

/// Serves each session from an in-process handler built for the credential
pub struct InProcessLauncher {
    factory: Arc<HandlerFactory>,
    timeout: Duration,
}

impl InProcessLauncher {
    pub fn new<F>(factory: F, timeout: Duration) -> Self
    where
        F: Fn(&str) -> Arc<dyn McpHandler> + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            timeout,
        }
    }

    /// Built-in Airtable tool server talking to `api_base`
    pub fn airtable(api_base: &str, timeout: Duration) -> Self {
        let client = AirtableClient::new(api_base);
        Self::new(
            move |token| {
                let handler: Arc<dyn McpHandler> =
                    Arc::new(AirtableMcpHandler::new(client.clone(), token));
                handler
            },
            timeout,
        )
    }
}

#[async_trait]
impl SessionLauncher for InProcessLauncher {
    async fn launch(&self, credential: &str) -> Result<McpTransport, McpError> {
        Ok(spawn_in_process((self.factory)(credential), self.timeout))
    }
}
