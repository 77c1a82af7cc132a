use crate::error::Result;
use crate::history::History;
use crate::providers::provider::{LlmProvider, Message, ToolCall};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::CustomIdentifier;
use futures_util::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one [`ToolLoop::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoopOutcome {
    /// Final assistant text.
    pub message: String,
    /// The conversation after the run, windowed like the requests were.
    pub history: Vec<Message>,
    /// The tool budget ran out and the answer came from a tools-disabled turn.
    pub timed_out: bool,
}

/// Drives one user turn: lets the model call tools until it answers, or
/// until the budget runs out.
#[derive(Clone)]
pub struct ToolLoop {
    provider: Arc<dyn LlmProvider>,
    model: String,
    api_key: Option<String>,
    max_tool_calls: usize,
    max_history: Option<usize>,
}

impl ToolLoop {
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            api_key: None,
            max_tool_calls: 5,
            max_history: Some(100),
        }
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Maximum number of tool-bearing turns before a final answer is forced.
    pub fn max_tool_calls(mut self, max_tool_calls: usize) -> Self {
        self.max_tool_calls = max_tool_calls;
        self
    }

    /// Request window size; `None` sends the whole log.
    pub fn max_history(mut self, max_history: Option<usize>) -> Self {
        self.max_history = max_history;
        self
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn run(
        &self,
        history: &mut History,
        registry: &ToolRegistry,
        custom_identifier: Option<&CustomIdentifier>,
    ) -> Result<LoopOutcome> {
        let degraded = self.provider.single_tool_call_per_turn();
        let budget = if degraded { 1 } else { self.max_tool_calls };
        let tool_defs = registry.tool_defs();

        for attempt in 1..=budget {
            let window = history.get_history(self.max_history);
            debug!(
                "Attempt {}/{}: calling {} with {} messages",
                attempt,
                budget,
                self.provider.name(),
                window.len()
            );
            let completion = self
                .provider
                .complete(&window, &tool_defs, &self.model, self.api_key.as_deref())
                .await?;

            let Some(mut calls) = completion.tool_calls.filter(|c| !c.is_empty()) else {
                history.add_message(Message::assistant(completion.message.as_str()));
                return Ok(self.outcome(completion.message, history, false));
            };

            if degraded {
                warn!(
                    "{} function calling is very unstable, and is limited to 1 tool call at a time. Use another model for better results.",
                    self.provider.name()
                );
                calls.truncate(1);
            }
            info!("Attempt {}: got {} tool calls", attempt, calls.len());
            history.add_message(Message::assistant_tool_calls(completion.message, calls.clone()));

            let results = join_all(
                calls
                    .iter()
                    .map(|call| dispatch(registry, call, custom_identifier)),
            )
            .await;
            for (call, result) in calls.iter().zip(results) {
                let content = match &result {
                    Ok(content) => content.clone(),
                    Err(e) => format!("Error: {e}"),
                };
                history.add_message(Message::tool_result(content, &call.id, call.name()));
                if degraded {
                    // The echo carries the bare parse error, without the prefix.
                    let echoed = result.unwrap_or_else(|e| e);
                    history.add_message(Message::user(format!(
                        "<tool>Automated tool response for id: {}: {}</tool>",
                        call.id, echoed
                    )));
                }
            }
        }

        warn!(
            "Tool call budget ({}) exhausted, requesting a final answer without tools",
            budget
        );
        let window = history.get_history(self.max_history);
        let completion = self
            .provider
            .complete(&window, &[], &self.model, self.api_key.as_deref())
            .await?;
        history.add_message(Message::assistant(completion.message.as_str()));
        Ok(self.outcome(completion.message, history, true))
    }

    fn outcome(&self, message: String, history: &History, timed_out: bool) -> LoopOutcome {
        LoopOutcome {
            message,
            history: history.get_history(self.max_history),
            timed_out,
        }
    }
}

/// Parse the call's arguments and run it. `Err` holds the argument parse
/// error; tool failures are already rendered into the `Ok` text.
async fn dispatch(
    registry: &ToolRegistry,
    call: &ToolCall,
    custom_identifier: Option<&CustomIdentifier>,
) -> std::result::Result<String, String> {
    let raw = call.function.arguments.trim();
    let args = if raw.is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str::<Value>(raw)
    };
    match args {
        Ok(args) => Ok(registry
            .call(call.name(), &args, custom_identifier)
            .await
            .content),
        Err(e) => {
            warn!("Bad arguments for tool {}: {}", call.name(), e);
            Err(e.to_string())
        }
    }
}
