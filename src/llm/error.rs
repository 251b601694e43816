//! Typed errors for LLM operations
//!
//! Provides structured error types so the orchestrator can map failure modes
//! (rejected key, exhausted quota, unreachable service) to HTTP statuses
//! without string matching at the call site.

use thiserror::Error;

/// LLM operation errors with typed variants
///
/// - `Unauthorized` (401/403) - API key missing, invalid or revoked
/// - `QuotaExceeded` (402/429, or a quota/billing message) - account limits
/// - `BadRequest` (400) - malformed request; caller error
/// - `ServiceError` (5xx) - server-side issue
/// - `Network` - connection/timeout
/// - `EmptyResponse` - the provider answered without any choice
/// - `InvalidResponse` - the body could not be parsed
#[derive(Debug, Error)]
pub enum LlmError {
    /// Authentication failed (HTTP 401/403)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit or billing quota exceeded
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Malformed request (HTTP 400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Server-side error (HTTP 5xx)
    #[error("Service error: {0}")]
    ServiceError(String),

    /// Network connectivity issue (connection refused, timeout, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Provider returned no choices
    #[error("No response from model")]
    EmptyResponse,

    /// Response body did not match the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Other errors not fitting the above categories
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LlmError {
    /// Check if this error means the API key was rejected
    pub fn is_auth_error(&self) -> bool {
        matches!(self, LlmError::Unauthorized(_))
    }

    /// Convert HTTP status code and error text into typed LlmError
    pub fn from_http_status(status: reqwest::StatusCode, error_text: String) -> Self {
        match status.as_u16() {
            401 | 403 => LlmError::Unauthorized(error_text),
            402 | 429 => LlmError::QuotaExceeded(error_text),
            _ if mentions_quota(&error_text) => LlmError::QuotaExceeded(error_text),
            400 => LlmError::BadRequest(error_text),
            500..=599 => LlmError::ServiceError(error_text),
            _ => LlmError::Other(anyhow::anyhow!("HTTP {}: {}", status, error_text)),
        }
    }

    /// Convert network/connection errors into typed LlmError
    pub fn from_network_error(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Network(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::Network(format!("Connection failed: {}", e))
        } else if let Some(status) = e.status() {
            let error_text = e.to_string();
            Self::from_http_status(status, error_text)
        } else if e.is_decode() {
            LlmError::InvalidResponse(e.to_string())
        } else {
            LlmError::Network(e.to_string())
        }
    }
}

fn mentions_quota(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("insufficient_quota") || lower.contains("quota") || lower.contains("billing")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_http_status() {
        let err = LlmError::from_http_status(
            reqwest::StatusCode::UNAUTHORIZED,
            "Incorrect API key provided".to_string(),
        );
        assert!(err.is_auth_error());

        let err = LlmError::from_http_status(
            reqwest::StatusCode::TOO_MANY_REQUESTS,
            "Rate limit reached".to_string(),
        );
        assert!(matches!(err, LlmError::QuotaExceeded(_)));

        let err =
            LlmError::from_http_status(reqwest::StatusCode::BAD_REQUEST, "Bad request".to_string());
        assert!(matches!(err, LlmError::BadRequest(_)));

        let err = LlmError::from_http_status(
            reqwest::StatusCode::SERVICE_UNAVAILABLE,
            "overloaded".to_string(),
        );
        assert!(matches!(err, LlmError::ServiceError(_)));
    }

    #[test]
    fn test_quota_detected_from_body() {
        let err = LlmError::from_http_status(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error":{"code":"insufficient_quota","message":"Check your plan and billing details"}}"#
                .to_string(),
        );
        assert!(matches!(err, LlmError::QuotaExceeded(_)));
    }

    #[test]
    fn test_error_display() {
        let err = LlmError::Unauthorized("bad key".to_string());
        assert_eq!(err.to_string(), "Unauthorized: bad key");
        assert_eq!(LlmError::EmptyResponse.to_string(), "No response from model");
    }
}
