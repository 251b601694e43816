//! LLM provider implementations

mod error;
mod openai;
mod types;

// Scripted provider for tests and offline runs (feature-gated)
#[cfg(feature = "test-sim")]
pub mod sim;
#[cfg(feature = "test-sim")]
pub use sim::ScriptedProvider;

pub use error::LlmError;
pub use openai::{OpenAiFunctionCall, OpenAiProvider, OpenAiToolCall, OPENAI_API_BASE};
pub use types::*;

use async_trait::async_trait;

/// Result type for LLM operations
pub type LlmResult<T> = std::result::Result<T, LlmError>;

/// Trait for LLM providers
///
/// A provider instance is bound to one API key. Callers build a fresh
/// provider per request from the credentials that request carried.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Send a chat completion request (non-streaming)
    ///
    /// `tools` of `None` (or an empty slice) sends no tool catalog, so the
    /// model can only answer with text.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
    ) -> LlmResult<LlmResponse>;

    /// Confirm the API key with a cheap read-only call
    async fn verify_credentials(&self) -> LlmResult<()>;
}
