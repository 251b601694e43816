//! Tool gateway over the in-process Airtable MCP server, against a mock
//! Airtable REST API

use airchat::mcp::{Implementation, JsonRpcError, McpHandler, McpToolDef, McpToolResult};
use airchat::tools::airtable::AirtableClient;
use airchat::tools::{
    CredentialProbe, InProcessLauncher, McpToolProvider, SessionLauncher, ToolError, ToolProvider,
};
use async_trait::async_trait;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn_airtable() -> String {
    async fn bases(headers: HeaderMap) -> impl IntoResponse {
        let ok = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "Bearer pat-good")
            .unwrap_or(false);
        if ok {
            (
                StatusCode::OK,
                Json(json!({"bases": [{"id": "appCRM", "name": "CRM", "permissionLevel": "create"}]})),
            )
        } else {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": {"type": "AUTHENTICATION_REQUIRED"}})),
            )
        }
    }

    let app = Router::new().route("/v0/meta/bases", get(bases));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v0", addr)
}

fn provider(api_base: &str, probe: CredentialProbe) -> McpToolProvider {
    let launcher: Arc<dyn SessionLauncher> = Arc::new(InProcessLauncher::airtable(api_base, TIMEOUT));
    McpToolProvider::new(launcher, probe)
}

#[tokio::test]
async fn test_catalog_is_stable_across_sessions() {
    let api_base = spawn_airtable().await;
    let tools = provider(&api_base, CredentialProbe::McpTool("list_bases".to_string()));

    let first: BTreeSet<String> = tools
        .list_tools("pat-good")
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    let second: BTreeSet<String> = tools
        .list_tools("pat-good")
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();

    assert_eq!(first, second);
    assert!(first.contains("list_bases"));
    assert!(first.contains("create_record"));
}

#[tokio::test]
async fn test_invoke_list_bases() {
    let api_base = spawn_airtable().await;
    let tools = provider(&api_base, CredentialProbe::McpTool("list_bases".to_string()));

    let payload = tools.invoke("list_bases", &json!({}), "pat-good").await.unwrap();
    let content: Value = serde_json::from_str(&payload).unwrap();
    assert_eq!(content[0]["type"], "text");
    assert!(content[0]["text"].as_str().unwrap().contains("appCRM"));
}

#[tokio::test]
async fn test_invoke_failures() {
    let api_base = spawn_airtable().await;
    let tools = provider(&api_base, CredentialProbe::McpTool("list_bases".to_string()));

    let err = tools.invoke("drop_base", &json!({}), "pat-good").await.unwrap_err();
    assert!(matches!(err, ToolError::NotFound(ref name) if name == "drop_base"));

    let err = tools
        .invoke("list_bases", &json!("not an object"), "pat-good")
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));

    let err = tools
        .invoke("create_record", &json!({"baseId": "appCRM"}), "pat-good")
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidArguments(_)));

    let err = tools.invoke("list_bases", &json!({}), "pat-bad").await.unwrap_err();
    assert!(matches!(err, ToolError::ExecutionFailed(ref msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_verify_credentials_via_tool() {
    let api_base = spawn_airtable().await;
    let tools = provider(&api_base, CredentialProbe::McpTool("list_bases".to_string()));

    assert!(tools.verify_credentials("pat-good").await.is_ok());
    assert!(tools.verify_credentials("pat-bad").await.is_err());
}

#[tokio::test]
async fn test_verify_credentials_via_rest() {
    let api_base = spawn_airtable().await;
    let tools = provider(
        &api_base,
        CredentialProbe::RestMetadata(AirtableClient::new(&api_base)),
    );

    assert!(tools.verify_credentials("pat-good").await.is_ok());
    let err = tools.verify_credentials("pat-bad").await.unwrap_err();
    assert!(err.is_auth_error());
}

/// Handler that never answers a call within the session timeout
struct StalledHandler;

#[async_trait]
impl McpHandler for StalledHandler {
    fn server_info(&self) -> Implementation {
        Implementation {
            name: "stalled".to_string(),
            version: "0".to_string(),
        }
    }

    async fn list_tools(&self) -> Vec<McpToolDef> {
        vec![McpToolDef {
            name: "wait".to_string(),
            description: "Never returns".to_string(),
            input_schema: json!({"type": "object"}),
        }]
    }

    async fn call_tool(&self, _name: &str, _arguments: Value) -> Result<McpToolResult, JsonRpcError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(McpToolResult::text("late"))
    }
}

#[tokio::test]
async fn test_stalled_tool_times_out() {
    let launcher: Arc<dyn SessionLauncher> = Arc::new(InProcessLauncher::new(
        |_token| {
            let handler: Arc<dyn McpHandler> = Arc::new(StalledHandler);
            handler
        },
        Duration::from_millis(200),
    ));
    let tools = McpToolProvider::new(launcher, CredentialProbe::McpTool("wait".to_string()));

    let err = tools.invoke("wait", &json!({}), "pat").await.unwrap_err();
    assert!(matches!(err, ToolError::Unavailable(_)));
}
