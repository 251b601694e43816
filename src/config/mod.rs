//! Configuration management for airchat

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub tool_provider: ToolProviderConfig,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub model: String,
    pub max_tokens: Option<usize>,
    pub base_url: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_tokens: None,
            base_url: crate::llm::OPENAI_API_BASE.to_string(),
        }
    }
}

/// How sessions with the tool server are opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToolTransport {
    /// Spawn `command` and speak MCP over its stdin/stdout
    #[default]
    Stdio,
    /// Built-in Airtable tool server on an in-memory stream
    InProcess,
}

/// How the tool-provider credential is checked by `/validate-keys`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialCheck {
    /// Call `probe_tool` with `{}` through an MCP session
    #[default]
    McpTool,
    /// Read the base list from the REST metadata API
    RestMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolProviderConfig {
    pub transport: ToolTransport,
    pub command: String,
    pub args: Vec<String>,
    /// Extra environment for the server process; values may use `${VAR}`
    pub env: HashMap<String, String>,
    /// Variable through which the credential reaches the server process
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub credential_check: CredentialCheck,
    pub probe_tool: String,
    /// Airtable REST API root, used by the in-process server and the REST probe
    pub api_base: String,
}

impl Default for ToolProviderConfig {
    fn default() -> Self {
        Self {
            transport: ToolTransport::Stdio,
            command: "npx".to_string(),
            args: vec!["airtable-mcp-server".to_string()],
            env: HashMap::from([("NODE_ENV".to_string(), "production".to_string())]),
            api_key_env: "AIRTABLE_API_KEY".to_string(),
            request_timeout_secs: 60,
            credential_check: CredentialCheck::McpTool,
            probe_tool: "list_bases".to_string(),
            api_base: crate::tools::airtable::AIRTABLE_API_BASE.to_string(),
        }
    }
}

impl ToolProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Instruction placed before every conversation
    pub system_prompt: String,
    /// Reply used when the follow-up model call returns no text
    pub fallback_reply: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            fallback_reply: "I completed the requested actions.".to_string(),
        }
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an AI assistant that helps users manage their Airtable data using MCP (Model Context Protocol) tools.

IMPORTANT INSTRUCTIONS FOR create_record:
- The create_record function REQUIRES a "fields" parameter that is an object containing the field values
- ALWAYS include the "fields" parameter when calling create_record
- Example: {"baseId": "appXXX", "tableId": "tblXXX", "fields": {"Name": "John", "Email": "john@example.com"}}
- If the user says "add logan, cornell to testing" or similar, use reasonable field names like {"Name": "logan", "Email": "cornell"} or {"First Name": "logan", "Last Name": "cornell"}

When creating records:
1. First get the table structure if needed with list_tables or describe_table
2. Use appropriate field names based on the context
3. ALWAYS provide the fields parameter as an object"#;

impl Config {
    /// Load configuration from an explicit path, or the default location
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                let config_path = Self::config_path();
                if config_path.exists() {
                    Self::load_from(&config_path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "airchat")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8787);
        assert_eq!(config.openai.model, "gpt-4");
        assert_eq!(config.tool_provider.command, "npx");
        assert_eq!(config.tool_provider.args, vec!["airtable-mcp-server"]);
        assert_eq!(config.tool_provider.api_key_env, "AIRTABLE_API_KEY");
        assert_eq!(config.tool_provider.request_timeout(), Duration::from_secs(60));
        assert!(config.chat.system_prompt.contains("\"fields\" parameter"));
        assert_eq!(config.chat.fallback_reply, "I completed the requested actions.");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9000

[openai]
model = "gpt-4o-mini"
max_tokens = 1024

[tool_provider]
transport = "in_process"
credential_check = "rest_metadata"
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.openai.model, "gpt-4o-mini");
        assert_eq!(config.openai.max_tokens, Some(1024));
        assert_eq!(config.tool_provider.transport, ToolTransport::InProcess);
        assert_eq!(
            config.tool_provider.credential_check,
            CredentialCheck::RestMetadata
        );
        assert_eq!(config.tool_provider.probe_tool, "list_bases");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/airchat.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = \"not a number\"").unwrap();
        assert!(Config::load(Some(file.path())).is_err());
    }
}
