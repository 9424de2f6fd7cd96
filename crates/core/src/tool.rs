//! Tool trait — the abstraction over the reasoner's capabilities.
//!
//! Tools are what let the reasoner observe the session (transcripts,
//! whiteboard, status), act on it (speak, persist profile updates, render
//! hints), and steer its own cadence (wait, re-pace, end the cycle).

use crate::error::ToolError;
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which of the three catalog groups a tool belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    /// Read-only getters (transcript, whiteboard, status).
    Observation,
    /// Side-effecting operations (speak, profile updates, hints).
    Action,
    /// Meta operations (wait, cadence, cycle termination).
    Control,
}

/// A request to execute a tool, with arguments already parsed to JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id (matches the reasoner's tool_call.id)
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

    /// The output content (JSON text handed back to the reasoner)
    pub output: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ToolResult {
    /// A successful result whose output is the JSON encoding of `value`.
    pub fn json(call_id: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            call_id: call_id.into(),
            success: true,
            output: value.to_string(),
            data: Some(value),
        }
    }

    /// A degraded result: `{"error": <message>}`. Still `success = false`
    /// but never an Err — the reasoner sees the error and adapts.
    pub fn error(call_id: impl Into<String>, message: impl Into<String>) -> Self {
        let value = serde_json::json!({ "error": message.into() });
        Self {
            call_id: call_id.into(),
            success: false,
            output: value.to_string(),
            data: Some(value),
        }
    }
}

/// The core Tool trait.
///
/// Each capability (get_audio_transcript, speak, wait_for_event, ...)
/// implements this trait. Tools are registered in the ToolRegistry and the
/// full catalog is offered to the reasoner on every request of a cycle.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "speak", "get_whiteboard").
    fn name(&self) -> &str;

    /// Which catalog group this tool belongs to.
    fn group(&self) -> ToolGroup;

    /// A description of what this tool does (sent verbatim to the reasoner).
    fn description(&self) -> &str;

    /// JSON Schema describing this tool's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with the given arguments.
    ///
    /// Handlers tolerate loose input: missing optional arguments fall back
    /// to their declared defaults, and invalid values produce an error
    /// result rather than an Err. An Err from this method means the
    /// handler itself could not even produce a degraded result.
    async fn execute(&self, arguments: serde_json::Value)
    -> std::result::Result<ToolResult, ToolError>;

    /// Convert this tool into a ToolDefinition for sending to the reasoner.
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
/// The exchange uses this to:
/// 1. Get the tool catalog to send to the reasoner
/// 2. Look up and execute tools when the reasoner requests them
///
/// Registration order is preserved so the catalog offered to the reasoner
/// is identical across every request of a cycle.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Names are validated unique at registration time;
    /// a duplicate is a programming error surfaced immediately, not a
    /// runtime ambiguity.
    pub fn register(&mut self, tool: Box<dyn Tool>) -> std::result::Result<(), ToolError> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(ToolError::DuplicateName(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Get a tool by name. Unknown names are tolerated (the reasoner is an
    /// untrusted caller); the exchange turns `None` into an error result.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|i| self.tools[*i].as_ref())
    }

    /// Get the full catalog, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.to_definition()).collect()
    }

    /// Execute a tool call. Unknown tools come back as `ToolError::NotFound`.
    pub async fn execute(&self, call: &ToolCall) -> std::result::Result<ToolResult, ToolError> {
        let tool = self
            .get(&call.name)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;
        tool.execute(call.arguments.clone()).await
    }

    /// List all registered tool names, in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    /// Names belonging to one catalog group.
    pub fn names_in_group(&self, group: ToolGroup) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|t| t.group() == group)
            .map(|t| t.name())
            .collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn group(&self) -> ToolGroup {
            ToolGroup::Observation
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(
            &self,
            arguments: serde_json::Value,
        ) -> std::result::Result<ToolResult, ToolError> {
            let text = arguments["text"].as_str().unwrap_or("").to_string();
            Ok(ToolResult {
                call_id: "test".into(),
                success: true,
                output: text,
                data: None,
            })
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn registry_rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let err = registry.register(Box::new(EchoTool)).unwrap_err();
        assert!(matches!(err, ToolError::DuplicateName(_)));
    }

    #[test]
    fn registry_definitions_preserve_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(EchoTool)).unwrap();

        let call = ToolCall {
            id: "call_1".into(),
            name: "echo".into(),
            arguments: serde_json::json!({"text": "hello world"}),
        };
        let result = registry.execute(&call).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "hello world");
    }

    #[tokio::test]
    async fn registry_execute_missing_tool() {
        let registry = ToolRegistry::new();
        let call = ToolCall {
            id: "call_1".into(),
            name: "nonexistent".into(),
            arguments: serde_json::json!({}),
        };
        let err = registry.execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn error_result_shape() {
        let r = ToolResult::error("call_9", "Unknown tool: frobnicate");
        assert!(!r.success);
        assert!(r.output.contains("Unknown tool: frobnicate"));
        let v: serde_json::Value = serde_json::from_str(&r.output).unwrap();
        assert!(v.get("error").is_some());
    }
}
