//! Tool provider gateway
//!
//! A [`ToolProvider`] lists the tools a data service exposes and executes
//! single calls against it. Credentials travel with every call; providers
//! hold no per-user state.

pub mod airtable;
mod error;
pub mod launcher;
mod mcp_provider;

#[cfg(feature = "test-sim")]
pub mod sim;
#[cfg(feature = "test-sim")]
pub use sim::ScriptedToolProvider;

pub use error::ToolError;
pub use launcher::{InProcessLauncher, SessionLauncher, StdioLauncher};
pub use mcp_provider::{CredentialProbe, McpToolProvider};

use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tool providers
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Current tool catalog, fetched fresh
    async fn list_tools(&self, credential: &str) -> Result<Vec<ToolDefinition>, ToolError>;

    /// Execute one tool call and return its result payload as text
    ///
    /// `arguments` must be a JSON object.
    async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        credential: &str,
    ) -> Result<String, ToolError>;

    /// Confirm the credential with a lightweight read-only call
    async fn verify_credentials(&self, credential: &str) -> Result<(), ToolError>;
}
