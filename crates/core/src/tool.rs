//! Tool trait: the abstraction over deterministic computations.
//!
//! Tools are what the specialist handlers call to compute things instead of
//! guessing: evaluate arithmetic, solve equations, look up constants.
//!
//! Every tool reports its outcome with the same wire convention: a JSON
//! object whose `status` is `"success"` (plus the payload fields) or
//! `"error"` (plus `error_message`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use crate::error::ToolError;
use crate::provider::ToolDefinition;

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

/// The result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// Whether the tool executed successfully
    pub success: bool,

    /// Human-readable output
    pub output: String,

    /// Structured wire payload (`status` + fields)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result. `fields` must be a JSON object; `status` is added.
    pub fn success(output: impl Into<String>, fields: serde_json::Value) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert("status".into(), "success".into());
        if let serde_json::Value::Object(map) = fields {
            payload.extend(map);
        }
        Self {
            call_id: String::new(),
            success: true,
            output: output.into(),
            data: Some(serde_json::Value::Object(payload)),
        }
    }

    /// A failed result carrying an error message.
    pub fn failure(error_message: impl Into<String>) -> Self {
        Self::failure_with(error_message, serde_json::json!({}))
    }

    /// A failed result with extra structured fields (e.g. valid alternatives).
    pub fn failure_with(error_message: impl Into<String>, fields: serde_json::Value) -> Self {
        let error_message = error_message.into();
        let mut payload = serde_json::Map::new();
        payload.insert("status".into(), "error".into());
        payload.insert("error_message".into(), error_message.clone().into());
        if let serde_json::Value::Object(map) = fields {
            payload.extend(map);
        }
        Self {
            call_id: String::new(),
            success: false,
            output: format!("Error: {error_message}"),
            data: Some(serde_json::Value::Object(payload)),
        }
    }

    /// Attach the call ID this result answers.
    pub fn for_call(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    /// The wire payload, falling back to a minimal status object.
    pub fn payload(&self) -> serde_json::Value {
        match &self.data {
            Some(data) => data.clone(),
            None if self.success => serde_json::json!({"status": "success", "output": self.output}),
            None => serde_json::json!({"status": "error", "error_message": self.output}),
        }
    }

    /// The `error_message` of a failed result.
    pub fn error_message(&self) -> Option<String> {
        if self.success {
            return None;
        }
        self.payload()["error_message"].as_str().map(String::from)
    }
}

/// One tool call paired with the one result it produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub call: ToolCall,
    pub result: ToolResult,
    /// Wall-clock execution time
    #[serde(default)]
    pub duration_ms: u64,
}

/// The core Tool trait.
///
/// Each tool (calculator, equation_solver, physics_constants) implements
/// this trait. Tools fail closed: invalid input yields `Ok` with a failed
/// [`ToolResult`]; `Err` is reserved for registry-level problems.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "calculator").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// A registry of available tools.
///
/// The dispatcher holds the full registry and hands each handler a
/// [`scoped`](ToolRegistry::scoped) view containing only its granted tools.
/// Tools are shared, so scoping never copies tool state.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// A registry holding only the named tools that exist here.
    pub fn scoped(&self, names: &[&str]) -> ToolRegistry {
        let tools = self
            .tools
            .iter()
            .filter(|(name, _)| names.contains(&name.as_str()))
            .map(|(name, tool)| (name.clone(), tool.clone()))
            .collect();
        ToolRegistry { tools }
    }

    /// Get all tool definitions (for sending to the LLM).
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self.tools.get(&call.name).ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        let result = tool.execute(call.arguments.clone()).await?;
        Ok(result.for_call(&call.id))
    }

    /// Execute a tool call, always producing exactly one result.
    ///
    /// Registry-level errors (unknown or ungranted tool, bad arguments)
    /// become failed results so the caller can always report back.
    pub async fn invoke(&self, call: ToolCall) -> ToolInvocation {
        let start = std::time::Instant::now();
        let result = match self.execute(&call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, error = %e, "Tool call rejected");
                ToolResult::failure(e.to_string()).for_call(&call.id)
            }
        };
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(tool = %call.name, success = result.success, duration_ms, "Tool invoked");
        ToolInvocation {
            call,
            result,
            duration_ms,
        }
    }

    /// List all registered tool names (sorted).
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
