//! Construction of the model and tool gateways

use crate::config::Config;
use crate::llm::{LlmProvider, OpenAiProvider};
use crate::tools::{McpToolProvider, ToolProvider};
use std::sync::Arc;

/// Builds the gateways a request talks to
///
/// The model gateway is bound to the caller's key, so one is made per
/// request. The tool gateway takes its credential per call and is shared.
pub trait GatewayFactory: Send + Sync {
    fn model(&self, api_key: &str) -> Arc<dyn LlmProvider>;
    fn tools(&self) -> Arc<dyn ToolProvider>;
}

/// OpenAI plus the configured MCP tool server
pub struct DefaultGateways {
    config: Arc<Config>,
    tools: Arc<dyn ToolProvider>,
}

impl DefaultGateways {
    pub fn new(config: Arc<Config>) -> Self {
        let tools = Arc::new(McpToolProvider::from_config(&config.tool_provider));
        Self { config, tools }
    }
}

impl GatewayFactory for DefaultGateways {
    fn model(&self, api_key: &str) -> Arc<dyn LlmProvider> {
        let openai = &self.config.openai;
        Arc::new(
            OpenAiProvider::new(api_key)
                .with_base_url(&openai.base_url)
                .with_model(&openai.model)
                .with_max_tokens(openai.max_tokens),
        )
    }

    fn tools(&self) -> Arc<dyn ToolProvider> {
        self.tools.clone()
    }
}

/// Fixed providers regardless of key; for tests and offline runs
#[cfg(feature = "test-sim")]
pub struct StaticGateways {
    pub model: Arc<dyn LlmProvider>,
    pub tools: Arc<dyn ToolProvider>,
}

#[cfg(feature = "test-sim")]
impl GatewayFactory for StaticGateways {
    fn model(&self, _api_key: &str) -> Arc<dyn LlmProvider> {
        self.model.clone()
    }

    fn tools(&self) -> Arc<dyn ToolProvider> {
        self.tools.clone()
    }
}
