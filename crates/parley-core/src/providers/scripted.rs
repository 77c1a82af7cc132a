use super::provider::{Completion, LlmProvider, Message};
use crate::error::{Error, Result};
use crate::tools::tool::ToolDef;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// What a [`ScriptedProvider`] saw on one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub model: String,
    pub api_key: Option<String>,
}

/// In-process provider that replays queued completions in order.
///
/// Running out of script is reported as a malformed response.
pub struct ScriptedProvider {
    name: String,
    single_tool_call: bool,
    script: Mutex<VecDeque<Completion>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            name: "Scripted".to_string(),
            single_tool_call: false,
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Behave like a backend limited to one tool call per turn.
    pub fn with_single_tool_call(mut self) -> Self {
        self.single_tool_call = true;
        self
    }

    pub fn push(&self, completion: Completion) {
        lock(&self.script).push_back(completion);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn single_tool_call_per_turn(&self) -> bool {
        self.single_tool_call
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDef],
        model: &str,
        api_key: Option<&str>,
    ) -> Result<Completion> {
        lock(&self.requests).push(RecordedRequest {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            model: model.to_string(),
            api_key: api_key.map(str::to_string),
        });
        lock(&self.script)
            .pop_front()
            .ok_or_else(|| Error::MalformedResponse {
                provider: self.name.clone(),
                detail: "script exhausted".to_string(),
            })
    }
}
