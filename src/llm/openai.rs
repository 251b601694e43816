//! OpenAI LLM provider implementation
//!
//! Uses the Chat Completions API with function calling. The API key comes
//! from the request that built this provider and is only ever sent to the
//! configured base URL.

use super::{
    ContentPart, LlmError, LlmProvider, LlmResponse, LlmResult, Message, MessageContent,
    TokenUsage, ToolCall, ToolDefinition,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Official OpenAI API base
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: Option<usize>,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: OPENAI_API_BASE.to_string(),
            model: "gpt-4".to_string(),
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<usize>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn chat_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.base_url)
    }

    fn convert_messages(messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = msg.role.as_str().to_string();

                match &msg.content {
                    MessageContent::Text(text) => OpenAiMessage {
                        role,
                        content: Some(text.clone()),
                        tool_calls: None,
                        tool_call_id: msg.tool_call_id.clone(),
                    },
                    MessageContent::Parts(parts) => {
                        let tool_calls: Vec<OpenAiToolCall> = msg
                            .tool_calls()
                            .into_iter()
                            .map(|call| OpenAiToolCall::from_call(&call))
                            .collect();

                        // Text parts are joined; a tool-call turn may carry none
                        let text: Vec<&str> = parts
                            .iter()
                            .filter_map(|p| match p {
                                ContentPart::Text { text } => Some(text.as_str()),
                                ContentPart::ToolUse { .. } => None,
                            })
                            .collect();
                        let content = if text.is_empty() {
                            None
                        } else {
                            Some(text.join("\n"))
                        };

                        OpenAiMessage {
                            role,
                            content,
                            tool_calls: if tool_calls.is_empty() {
                                None
                            } else {
                                Some(tool_calls)
                            },
                            tool_call_id: msg.tool_call_id.clone(),
                        }
                    }
                }
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                tool_type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn parse_response(response: OpenAiResponse) -> LlmResult<LlmResponse> {
        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(LlmError::EmptyResponse)?;

        let calls: Vec<ToolCall> = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall::from_raw_arguments(tc.id, tc.function.name, &tc.function.arguments))
            .collect();

        if calls.is_empty() {
            Ok(LlmResponse::Text {
                text: message.content.unwrap_or_default(),
                usage,
            })
        } else {
            Ok(LlmResponse::ToolCalls {
                text: message.content.filter(|t| !t.is_empty()),
                calls,
                usage,
            })
        }
    }

    async fn send_request(&self, request: &OpenAiRequest) -> LlmResult<OpenAiResponse> {
        tracing::debug!(
            "Sending {} messages to OpenAI (model={}, tools={})",
            request.messages.len(),
            request.model,
            request.tools.as_ref().map(Vec::len).unwrap_or(0)
        );

        let response = self
            .client
            .post(self.chat_url())
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("OpenAI request failed ({}): {}", status, error_text);
            return Err(LlmError::from_http_status(status, error_text));
        }

        response
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse> {
        let mut request = OpenAiRequest {
            model: self.model.clone(),
            messages: Self::convert_messages(messages),
            max_tokens: self.max_tokens,
            tools: None,
            tool_choice: None,
        };

        if let Some(tools) = tools.filter(|t| !t.is_empty()) {
            request.tools = Some(Self::convert_tools(tools));
            request.tool_choice = Some("auto".to_string());
        }

        let response = self.send_request(&request).await?;
        let parsed = Self::parse_response(response)?;

        if let Some(usage) = parsed.usage() {
            tracing::debug!(
                "OpenAI usage: {} in / {} out",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(parsed)
    }

    async fn verify_credentials(&self) -> LlmResult<()> {
        let response = self
            .client
            .get(self.models_url())
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(LlmError::from_network_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, body));
        }

        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

/// Tool call in OpenAI wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: OpenAiFunctionCall,
}

impl OpenAiToolCall {
    pub fn from_call(call: &ToolCall) -> Self {
        Self {
            id: call.id.clone(),
            call_type: "function".to_string(),
            function: OpenAiFunctionCall {
                name: call.name.clone(),
                arguments: call.raw_arguments(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenAiFunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
