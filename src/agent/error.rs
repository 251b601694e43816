//! Request-level errors for chat and credential validation

use crate::llm::LlmError;
use crate::tools::ToolError;
use std::fmt;
use thiserror::Error;

/// External service a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    Airtable,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "OpenAI"),
            Provider::Airtable => write!(f, "Airtable"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Both OpenAI and Airtable API keys are required")]
    MissingCredentials,

    #[error("{provider} rejected the API key: {message}")]
    AuthRejected { provider: Provider, message: String },

    #[error("API quota exceeded or billing issue: {0}")]
    QuotaExceeded(String),

    #[error("{provider} is unavailable: {message}")]
    ProviderUnavailable { provider: Provider, message: String },

    #[error("Tool catalog unavailable: {0}")]
    ToolCatalogUnavailable(#[source] ToolError),

    #[error("No response from OpenAI")]
    EmptyResponse,

    #[error("{0}")]
    Unknown(String),
}

impl ChatError {
    /// Whether a credential was refused, directly or while fetching the catalog
    pub fn is_auth_error(&self) -> bool {
        match self {
            ChatError::AuthRejected { .. } => true,
            ChatError::ToolCatalogUnavailable(e) => e.is_auth_error(),
            _ => false,
        }
    }

    /// Provider whose credential was refused, if any
    pub fn rejected_provider(&self) -> Option<Provider> {
        match self {
            ChatError::AuthRejected { provider, .. } => Some(*provider),
            ChatError::ToolCatalogUnavailable(e) if e.is_auth_error() => Some(Provider::Airtable),
            _ => None,
        }
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unauthorized(message) => ChatError::AuthRejected {
                provider: Provider::OpenAi,
                message,
            },
            LlmError::QuotaExceeded(message) => ChatError::QuotaExceeded(message),
            LlmError::ServiceError(message) | LlmError::Network(message) => {
                ChatError::ProviderUnavailable {
                    provider: Provider::OpenAi,
                    message,
                }
            }
            LlmError::EmptyResponse => ChatError::EmptyResponse,
            other => ChatError::Unknown(other.to_string()),
        }
    }
}
