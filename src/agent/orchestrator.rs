//! Single-round chat orchestration
//!
//! One request runs: tool catalog → model round 1 → (tool calls, serially)
//! → model round 2 without tools → reply. Tool failures are reported back to
//! the model as error results; catalog and model failures end the request.

use super::credentials::Credentials;
use super::error::ChatError;
use super::gateways::GatewayFactory;
use crate::llm::{LlmResponse, Message, ToolCall};
use std::sync::Arc;

/// Result of one orchestrated request
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub reply: String,
    /// Tool calls the model requested in round 1, in request order
    pub invoked_tools: Vec<ToolCall>,
}

pub struct ChatOrchestrator {
    gateways: Arc<dyn GatewayFactory>,
    system_prompt: String,
    fallback_reply: String,
}

impl ChatOrchestrator {
    pub fn new(
        gateways: Arc<dyn GatewayFactory>,
        system_prompt: impl Into<String>,
        fallback_reply: impl Into<String>,
    ) -> Self {
        Self {
            gateways,
            system_prompt: system_prompt.into(),
            fallback_reply: fallback_reply.into(),
        }
    }

    /// Answer the last turn of `history`, which the caller sends in full
    pub async fn run(
        &self,
        credentials: &Credentials,
        history: Vec<Message>,
    ) -> Result<ChatOutcome, ChatError> {
        credentials.require()?;

        let tools = self.gateways.tools();
        let catalog = tools
            .list_tools(&credentials.tool_key)
            .await
            .map_err(|e| {
                tracing::warn!("Tool catalog unavailable: {}", e);
                ChatError::ToolCatalogUnavailable(e)
            })?;
        tracing::debug!("Catalog fetched: {} tools", catalog.len());

        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(Message::system(self.system_prompt.as_str()));
        messages.extend(history);

        let model = self.gateways.model(&credentials.model_key);
        tracing::debug!("Using model provider {}", model.name());
        let first = model.chat(&messages, Some(&catalog)).await?;

        let (preamble, calls) = match first {
            LlmResponse::Text { text, .. } => {
                tracing::debug!("Round 1 answered with text");
                return Ok(ChatOutcome {
                    reply: text,
                    invoked_tools: Vec::new(),
                });
            }
            LlmResponse::ToolCalls { text, calls, .. } => (text, calls),
        };
        tracing::debug!("Round 1 requested {} tool calls", calls.len());

        messages.push(Message::assistant_tool_calls(preamble.as_deref(), &calls));

        for call in &calls {
            let content = match tools
                .invoke(&call.name, &call.arguments, &credentials.tool_key)
                .await
            {
                Ok(content) => {
                    tracing::info!(
                        "Tool {} succeeded: {}",
                        call.name,
                        truncate_preview(&content, 200)
                    );
                    content
                }
                Err(e) => {
                    tracing::warn!("Tool {} failed: {}", call.name, e);
                    format!("Error: {}", e)
                }
            };
            messages.push(Message::tool_result(call.id.as_str(), content));
        }

        tracing::debug!("Round 2 with {} messages", messages.len());
        let second = model.chat(&messages, None).await?;

        let reply = match second.text() {
            Some(text) if !text.trim().is_empty() => text.to_string(),
            _ => self.fallback_reply.clone(),
        };

        Ok(ChatOutcome {
            reply,
            invoked_tools: calls,
        })
    }
}

/// Truncate preview text to max length
fn truncate_preview(text: &str, max_len: usize) -> String {
    if text.len() > max_len {
        format!("{}...", truncate_at_char_boundary(text, max_len))
    } else {
        text.to_string()
    }
}

/// Truncate at UTF-8 character boundary
fn truncate_at_char_boundary(s: &str, max_bytes: usize) -> &str {
    if max_bytes >= s.len() {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
