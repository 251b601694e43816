//! Shared types for LLM providers

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Content of a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

impl MessageContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(s) => Some(s),
            MessageContent::Parts(parts) => parts.iter().find_map(|p| {
                if let ContentPart::Text { text } = p {
                    Some(text.as_str())
                } else {
                    None
                }
            }),
        }
    }
}

/// Part of a multi-part message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        raw_input: Option<String>,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
            tool_call_id: None,
        }
    }

    /// Assistant turn that requested tool calls.
    ///
    /// Any preamble text the model produced alongside the calls is kept as
    /// the first part so the follow-up request echoes the turn faithfully.
    pub fn assistant_tool_calls(text: Option<&str>, calls: &[ToolCall]) -> Self {
        let mut parts = Vec::with_capacity(calls.len() + 1);
        if let Some(text) = text.filter(|t| !t.is_empty()) {
            parts.push(ContentPart::Text {
                text: text.to_string(),
            });
        }
        parts.extend(calls.iter().map(|call| ContentPart::ToolUse {
            id: call.id.clone(),
            name: call.name.clone(),
            input: call.arguments.clone(),
            raw_input: call.raw.clone(),
        }));

        Self {
            role: Role::Assistant,
            content: MessageContent::Parts(parts),
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: MessageContent::Text(content.into()),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    /// Tool calls carried by this message, in order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolUse {
                        id,
                        name,
                        input,
                        raw_input,
                    } => Some(ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        arguments: input.clone(),
                        raw: raw_input.clone(),
                    }),
                    ContentPart::Text { .. } => None,
                })
                .collect(),
        }
    }
}

/// Response from an LLM
#[derive(Debug, Clone)]
pub enum LlmResponse {
    /// Plain text response
    Text {
        text: String,
        usage: Option<TokenUsage>,
    },
    /// Tool calls requested by the model, with any text it sent alongside
    ToolCalls {
        text: Option<String>,
        calls: Vec<ToolCall>,
        usage: Option<TokenUsage>,
    },
}

impl LlmResponse {
    pub fn text(&self) -> Option<&str> {
        match self {
            LlmResponse::Text { text, .. } => Some(text),
            LlmResponse::ToolCalls { text, .. } => text.as_deref(),
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            LlmResponse::ToolCalls { calls, .. } => calls,
            LlmResponse::Text { .. } => &[],
        }
    }

    pub fn usage(&self) -> Option<&TokenUsage> {
        match self {
            LlmResponse::Text { usage, .. } => usage.as_ref(),
            LlmResponse::ToolCalls { usage, .. } => usage.as_ref(),
        }
    }
}

/// A tool call from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Parsed arguments. Text the model sent that is not valid JSON is kept
    /// as a `Value::String` holding the raw text.
    pub arguments: Value,
    /// Argument text exactly as the model sent it, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl ToolCall {
    /// Build a call from the model's textual arguments.
    pub fn from_raw_arguments(
        id: impl Into<String>,
        name: impl Into<String>,
        raw_arguments: &str,
    ) -> Self {
        let name = name.into();
        let arguments = if raw_arguments.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw_arguments).unwrap_or_else(|e| {
                tracing::warn!("Unparseable arguments for tool {}: {}", name, e);
                Value::String(raw_arguments.to_string())
            })
        };

        let raw = Some(raw_arguments.to_string()).filter(|r| !r.trim().is_empty());

        Self {
            id: id.into(),
            name,
            arguments,
            raw,
        }
    }

    /// Arguments as the JSON text the model originally produced; calls built
    /// without that text serialize the parsed arguments.
    pub fn raw_arguments(&self) -> String {
        match (&self.raw, &self.arguments) {
            (Some(raw), _) => raw.clone(),
            (None, Value::String(raw)) => raw.clone(),
            (None, other) => other.to_string(),
        }
    }
}

/// Definition of a tool for the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_usage_default() {
        let usage = TokenUsage::default();
        assert_eq!(usage.input_tokens, 0);
        assert_eq!(usage.output_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn test_llm_response_text_with_usage() {
        let response = LlmResponse::Text {
            text: "Hello".to_string(),
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
            }),
        };

        assert_eq!(response.text(), Some("Hello"));
        assert!(response.tool_calls().is_empty());
        assert_eq!(response.usage().map(|u| u.total_tokens), Some(15));
    }

    #[test]
    fn test_llm_response_tool_calls_without_text() {
        let response = LlmResponse::ToolCalls {
            text: None,
            calls: vec![ToolCall::from_raw_arguments("call_1", "list_bases", "{}")],
            usage: None,
        };

        assert!(response.text().is_none());
        assert_eq!(response.tool_calls().len(), 1);
        assert!(response.usage().is_none());
    }

    #[test]
    fn test_raw_arguments_parsing() {
        let call = ToolCall::from_raw_arguments("1", "describe_table", r#"{"baseId":"app1"}"#);
        assert_eq!(call.arguments, json!({"baseId": "app1"}));

        let empty = ToolCall::from_raw_arguments("2", "list_bases", "  ");
        assert_eq!(empty.arguments, json!({}));

        let broken = ToolCall::from_raw_arguments("3", "create_record", "{\"fields\": ");
        assert_eq!(broken.arguments, Value::String("{\"fields\": ".to_string()));
        assert_eq!(broken.raw_arguments(), "{\"fields\": ");
        assert_eq!(empty.raw_arguments(), "{}");
    }

    #[test]
    fn test_raw_arguments_keep_model_text() {
        let text = r#"{ "tableId": "tbl1", "baseId": "app1" }"#;
        let call = ToolCall::from_raw_arguments("1", "describe_table", text);
        assert_eq!(call.arguments, json!({"baseId": "app1", "tableId": "tbl1"}));
        assert_eq!(call.raw_arguments(), text);

        // Survives the assistant turn used for the follow-up request
        let msg = Message::assistant_tool_calls(None, &[call]);
        assert_eq!(msg.tool_calls()[0].raw_arguments(), text);
    }

    #[test]
    fn test_assistant_tool_calls_round_trip() {
        let calls = vec![
            ToolCall::from_raw_arguments("a", "list_bases", "{}"),
            ToolCall::from_raw_arguments("b", "list_tables", r#"{"baseId":"app1"}"#),
        ];
        let msg = Message::assistant_tool_calls(Some("Checking"), &calls);

        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content.as_text(), Some("Checking"));
        assert_eq!(msg.tool_calls(), calls);
    }

    #[test]
    fn test_tool_result_message() {
        let msg = Message::tool_result("call_123", "[{\"type\":\"text\"}]");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    }
}
