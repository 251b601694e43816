//! HTTP server for the chat API

use crate::agent::{
    ChatError, ChatOrchestrator, CredentialValidator, Credentials, DefaultGateways,
    GatewayFactory, Provider,
};
use crate::config::Config;
use crate::llm::{Message, OpenAiToolCall};
use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

const MESSAGES_REQUIRED: &str = "Messages array is required";
const INVALID_API_KEY: &str =
    "Invalid API key. Please check your OpenAI or Airtable API keys in Settings.";
const QUOTA_EXCEEDED: &str =
    "API quota exceeded or billing issue. Please check your OpenAI account.";
const CHAT_FAILED: &str =
    "Sorry, there was an error processing your request. Please try again or check your API keys.";
const INVALID_OPENAI_KEY: &str = "Invalid OpenAI API key. Please check your key and try again.";
const INVALID_AIRTABLE_KEY: &str = "Invalid Airtable API key or connection failed. Please check your Personal Access Token and try again.";
const VALIDATION_FAILED: &str = "Validation failed. Please try again.";
const KEYS_VALID: &str = "Both API keys are valid and working!";

/// Shared application state
struct AppState {
    orchestrator: ChatOrchestrator,
    validator: CredentialValidator,
}

/// Keys as sent by the browser client
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiKeys {
    #[serde(default)]
    openai_key: Option<String>,
    #[serde(default)]
    airtable_key: Option<String>,
}

impl ApiKeys {
    /// Missing or malformed `apiKeys` count as empty keys
    fn from_body(body: &Value) -> Self {
        body.get("apiKeys")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }

    fn credentials(&self) -> Credentials {
        Credentials::new(
            self.openai_key.clone().unwrap_or_default(),
            self.airtable_key.clone().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    role: String,
    content: String,
}

/// Response for chat
#[derive(Debug, Serialize)]
struct ChatResponse {
    role: &'static str,
    content: String,
    #[serde(rename = "toolCalls", skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<OpenAiToolCall>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

/// Build the router with the given gateways
pub fn router(config: &Config, gateways: Arc<dyn GatewayFactory>) -> Router {
    let state = Arc::new(AppState {
        orchestrator: ChatOrchestrator::new(
            gateways.clone(),
            config.chat.system_prompt.as_str(),
            config.chat.fallback_reply.as_str(),
        ),
        validator: CredentialValidator::new(gateways),
    });

    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(handle_chat))
        .route("/validate-keys", post(handle_validate_keys))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Run the HTTP server until Ctrl-C
pub async fn run_http_server(config: Config, host: &str, port: u16) -> Result<()> {
    let config = Arc::new(config);
    let gateways: Arc<dyn GatewayFactory> = Arc::new(DefaultGateways::new(config.clone()));
    let app = router(&config, gateways);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Parse the caller's history; `Err` carries the 400 message
fn parse_messages(body: &Value) -> Result<Vec<Message>, String> {
    let raw = body
        .get("messages")
        .and_then(Value::as_array)
        .ok_or_else(|| MESSAGES_REQUIRED.to_string())?;

    raw.iter()
        .map(|item| {
            let msg: IncomingMessage = serde_json::from_value(item.clone())
                .map_err(|e| format!("Invalid message: {}", e))?;
            match msg.role.as_str() {
                "user" => Ok(Message::user(msg.content)),
                "assistant" => Ok(Message::assistant(msg.content)),
                "system" => Ok(Message::system(msg.content)),
                other => Err(format!("Unsupported message role: {}", other)),
            }
        })
        .collect()
}

fn chat_error_response(err: &ChatError) -> Response {
    match err {
        ChatError::MissingCredentials => {
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        e if e.is_auth_error() => error_response(StatusCode::UNAUTHORIZED, INVALID_API_KEY),
        ChatError::QuotaExceeded(_) => error_response(StatusCode::PAYMENT_REQUIRED, QUOTA_EXCEEDED),
        _ => error_response(StatusCode::INTERNAL_SERVER_ERROR, CHAT_FAILED),
    }
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("chat", %request_id);

    async move {
        let Json(body) = match body {
            Ok(body) => body,
            Err(rejection) => {
                tracing::debug!("Rejected chat body: {}", rejection);
                return error_response(StatusCode::BAD_REQUEST, MESSAGES_REQUIRED);
            }
        };

        let history = match parse_messages(&body) {
            Ok(history) => history,
            Err(message) => return error_response(StatusCode::BAD_REQUEST, &message),
        };
        let credentials = ApiKeys::from_body(&body).credentials();

        tracing::info!("Chat request with {} messages", history.len());

        match state.orchestrator.run(&credentials, history).await {
            Ok(outcome) => {
                tracing::info!(
                    "Chat complete ({} tool calls)",
                    outcome.invoked_tools.len()
                );
                Json(ChatResponse {
                    role: "assistant",
                    content: outcome.reply,
                    tool_calls: outcome
                        .invoked_tools
                        .iter()
                        .map(OpenAiToolCall::from_call)
                        .collect(),
                })
                .into_response()
            }
            Err(e) => {
                tracing::error!("Chat failed: {}", e);
                chat_error_response(&e)
            }
        }
    }
    .instrument(span)
    .await
}

async fn handle_validate_keys(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("validate_keys", %request_id);

    async move {
        let Json(body) = match body {
            Ok(body) => body,
            Err(rejection) => {
                tracing::debug!("Rejected validate-keys body: {}", rejection);
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, VALIDATION_FAILED);
            }
        };

        let credentials = ApiKeys::from_body(&body).credentials();

        match state.validator.validate(&credentials).await {
            Ok(()) => Json(json!({ "success": true, "message": KEYS_VALID })).into_response(),
            Err(ChatError::MissingCredentials) => error_response(
                StatusCode::BAD_REQUEST,
                &ChatError::MissingCredentials.to_string(),
            ),
            Err(e) => match e.rejected_provider() {
                Some(Provider::OpenAi) => {
                    error_response(StatusCode::UNAUTHORIZED, INVALID_OPENAI_KEY)
                }
                Some(Provider::Airtable) => {
                    error_response(StatusCode::UNAUTHORIZED, INVALID_AIRTABLE_KEY)
                }
                None => {
                    tracing::error!("Key validation failed: {}", e);
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, VALIDATION_FAILED)
                }
            },
        }
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    #[test]
    fn test_parse_messages() {
        let body = json!({
            "messages": [
                {"role": "user", "content": "list my bases"},
                {"role": "assistant", "content": "You have 2 bases."},
                {"role": "user", "content": "describe CRM"}
            ]
        });
        let history = parse_messages(&body).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[1].role, Role::Assistant);
        assert_eq!(history[2].content.as_text(), Some("describe CRM"));
    }

    #[test]
    fn test_parse_messages_rejections() {
        assert_eq!(parse_messages(&json!({})).unwrap_err(), MESSAGES_REQUIRED);
        assert_eq!(
            parse_messages(&json!({"messages": "hi"})).unwrap_err(),
            MESSAGES_REQUIRED
        );
        assert!(parse_messages(&json!({"messages": [{"role": "tool", "content": "x"}]}))
            .unwrap_err()
            .contains("Unsupported message role"));
        assert!(parse_messages(&json!({"messages": [{"role": "user"}]}))
            .unwrap_err()
            .starts_with("Invalid message"));
    }

    #[test]
    fn test_api_keys_tolerate_bad_shapes() {
        let creds = ApiKeys::from_body(&json!({"apiKeys": {"openaiKey": "sk"}})).credentials();
        assert_eq!(creds.model_key, "sk");
        assert!(!creds.is_complete());

        let creds = ApiKeys::from_body(&json!({"apiKeys": 42})).credentials();
        assert!(creds.model_key.is_empty());
    }

    #[test]
    fn test_chat_error_statuses() {
        let cases = [
            (ChatError::MissingCredentials, StatusCode::BAD_REQUEST),
            (
                ChatError::AuthRejected {
                    provider: Provider::OpenAi,
                    message: "bad".to_string(),
                },
                StatusCode::UNAUTHORIZED,
            ),
            (
                ChatError::QuotaExceeded("billing".to_string()),
                StatusCode::PAYMENT_REQUIRED,
            ),
            (ChatError::EmptyResponse, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(chat_error_response(&err).status(), status);
        }
    }
}
