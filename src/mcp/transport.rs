//! MCP transport implementations.
//!
//! Newline-delimited JSON-RPC over a pair of byte streams. The streams are
//! either the stdin/stdout of a spawned server process or one half of an
//! in-memory duplex connected to an in-process server.

use super::error::McpError;
use super::types::{JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Line-oriented JSON-RPC transport for MCP servers (async)
pub struct McpTransport {
    /// Request ID counter
    next_id: AtomicU64,
    writer: Mutex<BoxedWriter>,
    reader: Mutex<BufReader<BoxedReader>>,
    /// Server process, when the transport owns one
    child: Option<Mutex<Child>>,
    timeout: Duration,
}

impl McpTransport {
    /// Spawn a new MCP server process (async)
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        timeout: Duration,
    ) -> Result<Self, McpError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        cmd.envs(env);

        let mut child = cmd.spawn().map_err(|source| McpError::Spawn {
            command: command.to_string(),
            source,
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Protocol("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Protocol("Failed to get stdout".to_string()))?;

        tracing::debug!("Spawned MCP server: {} {}", command, args.join(" "));

        let mut transport = Self::from_streams(stdout, stdin, timeout);
        transport.child = Some(Mutex::new(child));
        Ok(transport)
    }

    /// Wrap an already-connected pair of streams
    pub fn from_streams<R, W>(reader: R, writer: W, timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            next_id: AtomicU64::new(1),
            writer: Mutex::new(Box::new(writer)),
            reader: Mutex::new(BufReader::new(Box::new(reader))),
            child: None,
            timeout,
        }
    }

    /// Send a request and wait for its response (async)
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = JsonRpcRequest::new(id, method, params);
        self.write_message(&request).await?;

        let response = tokio::time::timeout(self.timeout, self.read_response(id))
            .await
            .map_err(|_| McpError::Timeout {
                method: method.to_string(),
                secs: self.timeout.as_secs(),
            })??;

        if let Some(error) = response.error {
            return Err(McpError::Rpc(error));
        }

        // Some servers omit `result` for void methods
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Send a notification (no response expected) (async)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<(), McpError> {
        self.write_message(&JsonRpcRequest::notification(method, params))
            .await
    }

    /// End the session: close our write side and stop the server process
    pub async fn close(&self) -> Result<(), McpError> {
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.shutdown().await {
                tracing::debug!("MCP writer shutdown failed: {}", e);
            }
        }

        if let Some(child) = &self.child {
            let mut child = child.lock().await;
            if let Ok(None) = child.try_wait() {
                child.kill().await?;
            }
        }

        Ok(())
    }

    async fn write_message(&self, message: &JsonRpcRequest) -> Result<(), McpError> {
        let line = serde_json::to_string(message)?;
        tracing::debug!("MCP send: {}", line);

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    /// Read lines until the response carrying `id` arrives
    async fn read_response(&self, id: u64) -> Result<JsonRpcResponse, McpError> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                return Err(McpError::Closed);
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let message: Value = match serde_json::from_str(trimmed) {
                Ok(v) => v,
                Err(_) => {
                    tracing::debug!("Skipping non-JSON line from MCP server: {}", trimmed);
                    continue;
                }
            };

            // Notifications and server-initiated requests carry a method
            if message.get("method").is_some() {
                tracing::debug!("Skipping MCP server message: {}", trimmed);
                continue;
            }

            if message.get("id").and_then(Value::as_u64) != Some(id) {
                tracing::debug!("Skipping MCP response for another request: {}", trimmed);
                continue;
            }

            tracing::debug!("MCP recv: {}", trimmed);
            return Ok(serde_json::from_value(message)?);
        }
    }
}

/// Expand environment variable references like ${VAR} in a string
///
/// Unset variables are left as written.
pub fn expand_env_vars(input: &str) -> String {
    let re = match regex::Regex::new(r"\$\{([^}]+)\}") {
        Ok(re) => re,
        Err(_) => return input.to_string(),
    };

    re.replace_all(input, |cap: &regex::Captures| {
        std::env::var(&cap[1]).unwrap_or_else(|_| cap[0].to_string())
    })
    .into_owned()
}
