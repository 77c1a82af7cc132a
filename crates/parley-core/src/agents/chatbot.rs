use super::tool_loop::ToolLoop;
use crate::config::{Credentials, ParleyConfig};
use crate::error::{Error, Result};
use crate::history::History;
use crate::providers::provider::{LlmProvider, Message};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::CustomIdentifier;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Options for [`ChatBot`]. Unknown keys are rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChatBotOptions {
    #[serde(default)]
    pub system_message: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Seed conversation.
    #[serde(default)]
    pub history: Vec<Message>,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default)]
    pub custom_identifier: Option<CustomIdentifier>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tool_calls() -> usize {
    5
}

fn default_max_history() -> usize {
    100
}

impl Default for ChatBotOptions {
    fn default() -> Self {
        Self {
            system_message: String::new(),
            model: default_model(),
            api_key: None,
            history: Vec::new(),
            max_tool_calls: default_max_tool_calls(),
            max_history: default_max_history(),
            custom_identifier: None,
        }
    }
}

/// One conversation kept across many user messages.
pub struct ChatBot {
    system_message: String,
    history: History,
    tools: ToolRegistry,
    tool_loop: ToolLoop,
    custom_identifier: Option<CustomIdentifier>,
}

impl ChatBot {
    /// Route `options.model` through `config`; unsupported models fail here.
    pub fn new(
        options: ChatBotOptions,
        tools: ToolRegistry,
        config: &ParleyConfig,
        credentials: &Credentials,
    ) -> Result<Self> {
        let routed = config.route(&options.model, credentials)?;
        Ok(Self::build(options, tools, ToolLoop::new(routed.provider, routed.model)))
    }

    pub fn with_provider(
        options: ChatBotOptions,
        tools: ToolRegistry,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let model = options.model.clone();
        Self::build(options, tools, ToolLoop::new(provider, model))
    }

    fn build(options: ChatBotOptions, tools: ToolRegistry, tool_loop: ToolLoop) -> Self {
        let mut history = History::with_messages(options.history);
        if !options.system_message.is_empty() {
            history.set_system_message(options.system_message.as_str());
        }
        Self {
            system_message: options.system_message,
            history,
            tools,
            tool_loop: tool_loop
                .api_key(options.api_key)
                .max_tool_calls(options.max_tool_calls)
                .max_history(Some(options.max_history)),
            custom_identifier: options.custom_identifier,
        }
    }

    /// Append the user message, let the model work (tools included), return
    /// its final answer.
    pub async fn send_message(&mut self, text: impl Into<String>) -> Result<String> {
        self.history.add_message(Message::user(text));
        debug!(
            "ChatBot sending {} history messages to {}",
            self.history.len(),
            self.tool_loop.model()
        );
        let outcome = self
            .tool_loop
            .run(&mut self.history, &self.tools, self.custom_identifier.as_ref())
            .await?;
        Ok(outcome.message)
    }

    /// Replaces every previously set tool.
    pub fn set_tools(&mut self, tools: ToolRegistry) {
        self.tools = tools;
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Swap in an edited history. The bot's system message, if any, is
    /// re-applied to it.
    pub fn set_history(&mut self, mut history: History) {
        if !self.system_message.is_empty() {
            history.set_system_message(self.system_message.as_str());
        }
        self.history = history;
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = text.into();
        self.history.set_system_message(self.system_message.as_str());
    }

    pub fn set_custom_identifier(&mut self, custom_identifier: Option<CustomIdentifier>) {
        self.custom_identifier = custom_identifier;
    }

    pub fn custom_identifier(&self) -> Option<&CustomIdentifier> {
        self.custom_identifier.as_ref()
    }
}

/// Options for [`get_llm_response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LlmRequestOptions {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl LlmRequestOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            system_message: String::new(),
            model: default_model(),
            api_key: None,
        }
    }
}

/// One-shot completion with no tools and no retained history.
pub async fn get_llm_response(
    options: LlmRequestOptions,
    config: &ParleyConfig,
    credentials: &Credentials,
) -> Result<String> {
    if options.message.is_empty() {
        return Err(Error::missing("message"));
    }
    let routed = config.route(&options.model, credentials)?;
    llm_response_with(options, routed.provider.as_ref(), &routed.model).await
}

/// [`get_llm_response`] against an explicit provider.
pub async fn llm_response_with(
    options: LlmRequestOptions,
    provider: &dyn LlmProvider,
    model: &str,
) -> Result<String> {
    if options.message.is_empty() {
        return Err(Error::missing("message"));
    }
    let mut history = History::new();
    if !options.system_message.is_empty() {
        history.set_system_message(options.system_message);
    }
    history.add_message(Message::user(options.message));
    let completion = provider
        .complete(history.messages(), &[], model, options.api_key.as_deref())
        .await?;
    Ok(completion.message)
}
