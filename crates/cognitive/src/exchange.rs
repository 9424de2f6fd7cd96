//! The tool-aware exchange — one bounded conversation with the reasoner.
//!
//! Submits the message history plus the full tool catalog, executes the
//! tool calls the reasoner requests, feeds results back, and repeats
//! until the reasoner answers in plain text, calls the terminal tool, or
//! the iteration ceiling is hit. The ceiling is a soft degrade: the
//! exchange returns the last response with a warning, never an error.

use oxtutor_core::provider::{Provider, ProviderRequest};
use oxtutor_core::tool::{ToolCall, ToolRegistry};
use oxtutor_core::{Error, Message};
use std::sync::Arc;
use tracing::{debug, warn};

/// One tool invocation the reasoner made during the exchange, in request
/// order, with arguments already parsed. Calls whose arguments failed to
/// parse are not listed — the reasoner saw an error result instead.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
}

/// What came out of one exchange.
#[derive(Debug, Clone)]
pub struct ExchangeReport {
    /// The reasoner's final text content (may be empty when the exchange
    /// ended on a terminal tool).
    pub content: String,

    /// Every tool successfully dispatched, in order.
    pub invocations: Vec<ToolInvocation>,

    /// Whether the iteration ceiling cut the exchange short.
    pub hit_ceiling: bool,
}

impl ExchangeReport {
    /// Names of the tools called, in order.
    pub fn tools_called(&self) -> Vec<&str> {
        self.invocations.iter().map(|i| i.name.as_str()).collect()
    }

    /// The parsed arguments of the first invocation of `tool`, if any.
    pub fn invocation_args(&self, tool: &str) -> Option<&serde_json::Value> {
        self.invocations
            .iter()
            .find(|i| i.name == tool)
            .map(|i| &i.arguments)
    }
}

/// Orchestrates reasoner calls and tool execution for one conversation.
pub struct ToolExchange {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    max_iterations: u32,
    terminal_tool: Option<String>,
}

impl ToolExchange {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature,
            max_tokens: None,
            max_iterations: 10,
            terminal_tool: None,
        }
    }

    /// Set the iteration ceiling (reasoner round-trips per exchange).
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Name a tool that ends the exchange once its batch resolves.
    pub fn with_terminal_tool(mut self, name: impl Into<String>) -> Self {
        self.terminal_tool = Some(name.into());
        self
    }

    /// Run the exchange to completion.
    ///
    /// `messages` is the seed transcript (system prompt, history, cycle
    /// instruction); tool turns are appended to it in place so the caller
    /// can inspect the full conversation afterwards.
    pub async fn run(
        &self,
        messages: &mut Vec<Message>,
        tools: &ToolRegistry,
    ) -> Result<ExchangeReport, Error> {
        let definitions = tools.definitions();
        let mut invocations = Vec::new();
        let mut last_content = String::new();
        let mut iteration = 0u32;

        loop {
            iteration += 1;
            if iteration > self.max_iterations {
                warn!(
                    iterations = self.max_iterations,
                    "Tool iteration ceiling reached, ending exchange"
                );
                return Ok(ExchangeReport {
                    content: last_content,
                    invocations,
                    hit_ceiling: true,
                });
            }

            debug!(iteration, "Exchange iteration");

            let response = self
                .provider
                .complete(ProviderRequest {
                    model: self.model.clone(),
                    messages: messages.clone(),
                    temperature: self.temperature,
                    max_tokens: self.max_tokens,
                    tools: definitions.clone(),
                })
                .await?;

            let finished = response.finish_reason.as_deref() == Some("stop");
            let tool_calls = response.message.tool_calls.clone();
            last_content = response.message.content.clone();
            messages.push(response.message);

            if tool_calls.is_empty() {
                return Ok(ExchangeReport {
                    content: last_content,
                    invocations,
                    hit_ceiling: false,
                });
            }

            let mut saw_terminal = false;
            for tc in &tool_calls {
                if self.terminal_tool.as_deref() == Some(tc.name.as_str()) {
                    saw_terminal = true;
                }

                let arguments: serde_json::Value = match serde_json::from_str(&tc.arguments) {
                    Ok(v) => v,
                    Err(e) => {
                        // The reasoner produced broken JSON. Tell it so and
                        // move on without touching the handler.
                        warn!(tool = %tc.name, error = %e, "Malformed tool arguments");
                        messages.push(Message::tool_result(
                            &tc.id,
                            serde_json::json!({
                                "error": format!("malformed arguments: {e}")
                            })
                            .to_string(),
                        ));
                        continue;
                    }
                };

                let call = ToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: arguments.clone(),
                };

                match tools.execute(&call).await {
                    Ok(result) => {
                        debug!(tool = %tc.name, success = result.success, "Tool executed");
                        invocations.push(ToolInvocation {
                            name: tc.name.clone(),
                            arguments,
                        });
                        messages.push(Message::tool_result(&tc.id, &result.output));
                    }
                    Err(e) => {
                        warn!(tool = %tc.name, error = %e, "Tool dispatch failed");
                        messages.push(Message::tool_result(
                            &tc.id,
                            serde_json::json!({ "error": e.to_string() }).to_string(),
                        ));
                    }
                }
            }

            if saw_terminal || finished {
                return Ok(ExchangeReport {
                    content: last_content,
                    invocations,
                    hit_ceiling: false,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oxtutor_core::error::{ProviderError, ToolError};
    use oxtutor_core::message::MessageToolCall;
    use oxtutor_core::provider::ProviderResponse;
    use oxtutor_core::tool::{Tool, ToolGroup, ToolResult};
    use std::sync::Mutex;

    /// Plays back a fixed script of responses, one per `complete` call.
    struct ScriptedProvider {
        script: Mutex<Vec<ProviderResponse>>,
    }

    impl ScriptedProvider {
        fn new(mut responses: Vec<ProviderResponse>) -> Self {
            responses.reverse();
            Self {
                script: Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.script
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ProviderError::Timeout("script exhausted".into()))
        }
    }

    fn text_response(content: &str) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant(content),
            finish_reason: Some("stop".into()),
            model: "mock".into(),
            usage: None,
        }
    }

    fn tool_response(calls: Vec<(&str, &str, &str)>) -> ProviderResponse {
        ProviderResponse {
            message: Message::assistant_tool_calls(
                "",
                calls
                    .into_iter()
                    .map(|(id, name, args)| MessageToolCall {
                        id: id.into(),
                        name: name.into(),
                        arguments: args.into(),
                    })
                    .collect(),
            ),
            finish_reason: Some("tool_calls".into()),
            model: "mock".into(),
            usage: None,
        }
    }

    struct PingTool;

    #[async_trait]
    impl Tool for PingTool {
        fn name(&self) -> &str {
            "ping"
        }
        fn group(&self) -> ToolGroup {
            ToolGroup::Observation
        }
        fn description(&self) -> &str {
            "Replies pong"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({ "type": "object", "properties": {} })
        }
        async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::json("", serde_json::json!({ "pong": true })))
        }
    }

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Box::new(PingTool)).unwrap();
        r
    }

    #[tokio::test]
    async fn plain_text_is_terminal() {
        let provider = Arc::new(ScriptedProvider::new(vec![text_response("all quiet")]));
        let exchange = ToolExchange::new(provider, "mock", 0.3);

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        assert_eq!(report.content, "all quiet");
        assert!(report.invocations.is_empty());
        assert!(!report.hit_ceiling);
    }

    #[tokio::test]
    async fn tool_calls_get_results_then_final_text() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            ProviderResponse {
                finish_reason: Some("tool_calls".into()),
                ..tool_response(vec![("call_1", "ping", "{}")])
            },
            text_response("done"),
        ]));
        let exchange = ToolExchange::new(provider, "mock", 0.3);

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        assert_eq!(report.content, "done");
        assert_eq!(report.tools_called(), vec!["ping"]);
        // user, assistant(tool_calls), tool, assistant(final)
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![("call_1", "levitate", "{}")]),
            text_response("noted"),
        ]));
        let exchange = ToolExchange::new(provider, "mock", 0.3);

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        assert!(report.invocations.is_empty());
        let tool_turn = &messages[2];
        assert!(tool_turn.content.contains("levitate"));
        assert!(tool_turn.content.contains("error"));
        assert_eq!(report.content, "noted");
    }

    #[tokio::test]
    async fn malformed_arguments_skip_handler() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            tool_response(vec![("call_1", "ping", "{not json")]),
            text_response("recovered"),
        ]));
        let exchange = ToolExchange::new(provider, "mock", 0.3);

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        assert!(report.invocations.is_empty());
        assert!(messages[2].content.contains("malformed arguments"));
    }

    #[tokio::test]
    async fn ceiling_returns_last_response_softly() {
        // Every turn requests another tool call; the script is longer than
        // the ceiling allows.
        let responses: Vec<_> = (0..5)
            .map(|i| tool_response(vec![(&format!("call_{i}"), "ping", "{}")]))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(responses));
        let exchange = ToolExchange::new(provider, "mock", 0.3).with_max_iterations(3);

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        assert!(report.hit_ceiling);
        assert_eq!(report.invocations.len(), 3);
    }

    #[tokio::test]
    async fn terminal_tool_ends_after_batch() {
        let provider = Arc::new(ScriptedProvider::new(vec![tool_response(vec![
            ("call_1", "ping", "{}"),
            ("call_2", "ping", "{}"),
        ])]));
        let exchange = ToolExchange::new(provider, "mock", 0.3).with_terminal_tool("ping");

        let mut messages = vec![Message::user("observe")];
        let report = exchange.run(&mut messages, &registry()).await.unwrap();

        // Both calls in the terminal batch still ran.
        assert_eq!(report.invocations.len(), 2);
        assert!(!report.hit_ceiling);
    }

    #[tokio::test]
    async fn provider_error_propagates() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let exchange = ToolExchange::new(provider, "mock", 0.3);

        let mut messages = vec![Message::user("observe")];
        let result = exchange.run(&mut messages, &registry()).await;
        assert!(matches!(result, Err(Error::Provider(_))));
    }
}
