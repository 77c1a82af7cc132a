use super::openai::{chat_completion, resolve_key};
use super::provider::{Completion, LlmProvider, Message};
use crate::error::Result;
use crate::tools::tool::ToolDef;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";

/// OpenAI-compatible backend whose tool calling does not survive more than
/// one call per turn.
pub struct DeepSeekProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    keyless: bool,
}

impl DeepSeekProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            keyless: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Send unauthenticated requests when no key is supplied.
    pub fn keyless(mut self) -> Self {
        self.keyless = true;
        self
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &str {
        "DeepSeek"
    }

    fn single_tool_call_per_turn(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDef],
        model: &str,
        api_key: Option<&str>,
    ) -> Result<Completion> {
        let key = resolve_key(self.name(), api_key, self.api_key.as_deref(), self.keyless)?;
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        chat_completion(&self.client, self.name(), &url, key, messages, tools, model).await
    }
}
