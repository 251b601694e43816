//! Per-request credential pair and its validation

use super::error::{ChatError, Provider};
use super::gateways::GatewayFactory;
use std::fmt;
use std::sync::Arc;

/// API keys supplied by the caller for one request; never stored
#[derive(Clone, Default)]
pub struct Credentials {
    pub model_key: String,
    pub tool_key: String,
}

impl Credentials {
    pub fn new(model_key: impl Into<String>, tool_key: impl Into<String>) -> Self {
        Self {
            model_key: model_key.into().trim().to_string(),
            tool_key: tool_key.into().trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.model_key.trim().is_empty() && !self.tool_key.trim().is_empty()
    }

    pub fn require(&self) -> Result<(), ChatError> {
        if self.is_complete() {
            Ok(())
        } else {
            Err(ChatError::MissingCredentials)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |key: &str| if key.is_empty() { "<empty>" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("model_key", &redact(&self.model_key))
            .field("tool_key", &redact(&self.tool_key))
            .finish()
    }
}

/// Checks both keys against their services, model first
pub struct CredentialValidator {
    gateways: Arc<dyn GatewayFactory>,
}

impl CredentialValidator {
    pub fn new(gateways: Arc<dyn GatewayFactory>) -> Self {
        Self { gateways }
    }

    /// The tool-provider key is only tried once the model key passed
    pub async fn validate(&self, credentials: &Credentials) -> Result<(), ChatError> {
        credentials.require()?;

        if let Err(e) = self
            .gateways
            .model(&credentials.model_key)
            .verify_credentials()
            .await
        {
            tracing::info!("OpenAI key rejected: {}", e);
            return Err(ChatError::AuthRejected {
                provider: Provider::OpenAi,
                message: e.to_string(),
            });
        }

        if let Err(e) = self
            .gateways
            .tools()
            .verify_credentials(&credentials.tool_key)
            .await
        {
            tracing::info!("Airtable key rejected: {}", e);
            return Err(ChatError::AuthRejected {
                provider: Provider::Airtable,
                message: e.to_string(),
            });
        }

        tracing::debug!("Both API keys verified");
        Ok(())
    }
}
