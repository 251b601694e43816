//! Scripted tool provider for tests and offline runs

use super::{ToolError, ToolProvider};
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// A recorded `invoke` call
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub name: String,
    pub arguments: Value,
}

/// In-memory tool provider with canned results per tool
///
/// Tools without a canned result answer `ToolError::NotFound`. When an
/// accepted key is set, every other credential is refused.
#[derive(Default)]
pub struct ScriptedToolProvider {
    tools: Vec<ToolDefinition>,
    results: HashMap<String, Result<String, ToolError>>,
    accepted_key: Option<String>,
    catalog_error: Option<ToolError>,
    invocations: Mutex<Vec<Invocation>>,
    list_calls: Mutex<usize>,
    verify_calls: Mutex<usize>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedToolProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool that succeeds with `result`
    pub fn with_tool(mut self, name: &str, result: impl Into<String>) -> Self {
        self.tools.push(definition(name));
        self.results.insert(name.to_string(), Ok(result.into()));
        self
    }

    /// Add a tool whose every invocation fails with `err`
    pub fn with_failing_tool(mut self, name: &str, err: ToolError) -> Self {
        self.tools.push(definition(name));
        self.results.insert(name.to_string(), Err(err));
        self
    }

    pub fn accepting_only(mut self, key: &str) -> Self {
        self.accepted_key = Some(key.to_string());
        self
    }

    /// Make `list_tools` fail
    pub fn with_catalog_error(mut self, err: ToolError) -> Self {
        self.catalog_error = Some(err);
        self
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        lock(&self.invocations).clone()
    }

    pub fn list_calls(&self) -> usize {
        *lock(&self.list_calls)
    }

    pub fn verify_calls(&self) -> usize {
        *lock(&self.verify_calls)
    }

    fn check(&self, credential: &str) -> Result<(), ToolError> {
        match &self.accepted_key {
            Some(key) if key != credential => Err(ToolError::AuthRejected(
                "Invalid authentication token".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

fn definition(name: &str) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: format!("Scripted tool {}", name),
        parameters: json!({"type": "object", "properties": {}}),
    }
}

#[async_trait]
impl ToolProvider for ScriptedToolProvider {
    async fn list_tools(&self, credential: &str) -> Result<Vec<ToolDefinition>, ToolError> {
        *lock(&self.list_calls) += 1;
        self.check(credential)?;
        if let Some(err) = &self.catalog_error {
            return Err(err.clone());
        }
        Ok(self.tools.clone())
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: &Value,
        credential: &str,
    ) -> Result<String, ToolError> {
        lock(&self.invocations).push(Invocation {
            name: name.to_string(),
            arguments: arguments.clone(),
        });
        self.check(credential)?;

        if !arguments.is_object() {
            return Err(ToolError::InvalidArguments(arguments.to_string()));
        }

        self.results
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ToolError::NotFound(name.to_string())))
    }

    async fn verify_credentials(&self, credential: &str) -> Result<(), ToolError> {
        *lock(&self.verify_calls) += 1;
        self.check(credential)
    }
}
