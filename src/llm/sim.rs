//! Scripted LLM provider for tests and offline runs
//!
//! Replies are queued up front and handed out one per `chat` call, in order.
//! Every request is recorded so tests can assert what the model was sent.

use super::{LlmError, LlmProvider, LlmResponse, LlmResult, Message, ToolCall, ToolDefinition};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// What a single `chat` call received
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    /// `None` when no catalog (or an empty one) was sent
    pub tools: Option<Vec<ToolDefinition>>,
}

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<LlmResult<LlmResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    reject_credentials: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose key is refused by every call
    pub fn rejecting() -> Self {
        Self {
            reject_credentials: true,
            ..Self::default()
        }
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(LlmResponse::Text {
            text: text.into(),
            usage: None,
        }))
    }

    pub fn with_tool_calls(self, calls: Vec<ToolCall>) -> Self {
        self.push(Ok(LlmResponse::ToolCalls {
            text: None,
            calls,
            usage: None,
        }))
    }

    pub fn with_error(self, err: LlmError) -> Self {
        self.push(Err(err))
    }

    fn push(self, reply: LlmResult<LlmResponse>) -> Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse> {
        lock(&self.requests).push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.filter(|t| !t.is_empty()).map(<[_]>::to_vec),
        });

        if self.reject_credentials {
            return Err(LlmError::Unauthorized(
                "Incorrect API key provided".to_string(),
            ));
        }

        // Script exhausted
        lock(&self.replies)
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    async fn verify_credentials(&self) -> LlmResult<()> {
        if self.reject_credentials {
            Err(LlmError::Unauthorized(
                "Incorrect API key provided".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_in_order_and_records_requests() {
        let provider = ScriptedProvider::new()
            .with_tool_calls(vec![ToolCall::from_raw_arguments("c1", "list_bases", "{}")])
            .with_text("two bases");

        let first = provider.chat(&[Message::user("hi")], None).await.unwrap();
        assert_eq!(first.tool_calls().len(), 1);

        let second = provider.chat(&[Message::user("hi")], Some(&[])).await.unwrap();
        assert_eq!(second.text(), Some("two bases"));

        let third = provider.chat(&[], None).await;
        assert!(matches!(third, Err(LlmError::EmptyResponse)));

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[1].tools.is_none());
    }

    #[tokio::test]
    async fn test_rejecting_provider() {
        let provider = ScriptedProvider::rejecting().with_text("unused");
        assert!(provider.verify_credentials().await.unwrap_err().is_auth_error());
        assert!(provider.chat(&[], None).await.unwrap_err().is_auth_error());
        assert_eq!(provider.requests().len(), 1);
    }
}
