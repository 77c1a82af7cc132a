use super::openai::{backend_error, resolve_key};
use super::provider::{Completion, LlmProvider, Message, Role, ToolCall};
use crate::error::Result;
use crate::tools::tool::ToolDef;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const MAX_TOKENS: u32 = 1024;
const EMPTY_RESPONSE_APOLOGY: &str =
    "I apologize, but I couldn't generate a response. Please try again.";

pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    keyless: bool,
}

impl AnthropicProvider {
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

fn build_anthropic_messages(messages: &[Message]) -> (Option<String>, Vec<Value>) {
    let mut system = None;
    let mut msgs = Vec::new();

    for m in messages {
        match m.role {
            Role::System => system = Some(m.content.clone()).filter(|s| !s.is_empty()),
            Role::User => msgs.push(json!({ "role": "user", "content": m.content })),
            Role::Assistant => match &m.tool_calls {
                Some(calls) => {
                    let mut content = Vec::with_capacity(calls.len() + 1);
                    if !m.content.is_empty() {
                        content.push(json!({ "type": "text", "text": m.content }));
                    }
                    for call in calls {
                        let input: Value = serde_json::from_str(&call.function.arguments)
                            .unwrap_or_else(|_| json!({}));
                        content.push(json!({
                            "type": "tool_use",
                            "id": call.id,
                            "name": call.function.name,
                            "input": input
                        }));
                    }
                    msgs.push(json!({ "role": "assistant", "content": content }));
                }
                None => msgs.push(json!({ "role": "assistant", "content": m.content })),
            },
            Role::Tool => {
                // Tool results travel as user turns with a tool_result block
                msgs.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                        "content": m.content
                    }]
                }));
            }
        }
    }

    (system, msgs)
}

fn build_anthropic_tools(tools: &[ToolDef]) -> Vec<Value> {
    tools
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "input_schema": t.parameters
            })
        })
        .collect()
}

fn parse_anthropic_response(data: &Value) -> Completion {
    let blocks = match data["content"].as_array() {
        Some(blocks) if !blocks.is_empty() => blocks,
        _ => {
            warn!("Anthropic API returned an empty or invalid response");
            return Completion::text(EMPTY_RESPONSE_APOLOGY);
        }
    };

    if data["stop_reason"].as_str() == Some("tool_use") {
        if let Some(block) = blocks.iter().find(|b| b["type"] == "tool_use") {
            let call = ToolCall::new(
                block["id"].as_str().unwrap_or_default(),
                block["name"].as_str().unwrap_or_default(),
                block["input"].to_string(),
            );
            return Completion::tool_calls("", vec![call]);
        }
    }

    let text = blocks
        .iter()
        .find(|b| b["type"] == "text")
        .and_then(|b| b["text"].as_str())
        .unwrap_or_default();
    Completion::text(text)
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "Anthropic"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDef],
        model: &str,
        api_key: Option<&str>,
    ) -> Result<Completion> {
        let key = resolve_key(self.name(), api_key, self.api_key.as_deref(), self.keyless)?;
        let (system, msgs) = build_anthropic_messages(messages);
        let tools_val = build_anthropic_tools(tools);

        let mut body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": msgs
        });
        if let Some(sys) = system {
            body["system"] = json!(sys);
        }
        if !tools_val.is_empty() {
            body["tools"] = json!(tools_val);
        }

        debug!("Anthropic request: {} messages, {} tools", messages.len(), tools.len());
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let mut req = self
            .client
            .post(&url)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = key {
            req = req.header("x-api-key", key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(backend_error(self.name(), status.as_u16(), &text));
        }
        let data: Value = resp.json().await?;
        Ok(parse_anthropic_response(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::providers::test_server::{respond_json, serve_once};

    #[test]
    fn system_is_lifted_and_tool_turns_are_converted() {
        let history = vec![
            Message::system("be brief"),
            Message::user("what time is it?"),
            Message::assistant_tool_calls(
                "checking",
                vec![ToolCall::new("toolu_1", "getDate", "{\"includeTime\":true}")],
            ),
            Message::tool_result("2025-01-01T00:00:00.000Z", "toolu_1", "getDate"),
        ];
        let (system, msgs) = build_anthropic_messages(&history);
        assert_eq!(system.as_deref(), Some("be brief"));
        assert_eq!(msgs.len(), 3);
        assert_eq!(msgs[1]["content"][0], json!({ "type": "text", "text": "checking" }));
        assert_eq!(msgs[1]["content"][1]["type"], "tool_use");
        assert_eq!(msgs[1]["content"][1]["input"], json!({ "includeTime": true }));
        assert_eq!(msgs[2]["role"], "user");
        assert_eq!(msgs[2]["content"][0]["tool_use_id"], "toolu_1");
    }

    #[test]
    fn unparseable_tool_arguments_become_empty_input() {
        let history = vec![Message::assistant_tool_calls(
            "",
            vec![ToolCall::new("toolu_1", "getDate", "not json")],
        )];
        let (_, msgs) = build_anthropic_messages(&history);
        assert_eq!(msgs[0]["content"].as_array().unwrap().len(), 1);
        assert_eq!(msgs[0]["content"][0]["input"], json!({}));
    }

    #[test]
    fn tool_use_stop_synthesizes_one_call() {
        let data = json!({
            "stop_reason": "tool_use",
            "content": [
                { "type": "text", "text": "Let me check." },
                { "type": "tool_use", "id": "toolu_9", "name": "getDate", "input": { "includeTime": false } },
                { "type": "tool_use", "id": "toolu_10", "name": "getDate", "input": {} }
            ]
        });
        let out = parse_anthropic_response(&data);
        assert_eq!(out.message, "");
        let calls = out.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "toolu_9");
        assert_eq!(calls[0].kind, "function");
        assert_eq!(calls[0].function.arguments, "{\"includeTime\":false}");
    }

    #[test]
    fn empty_content_yields_apology() {
        assert_eq!(
            parse_anthropic_response(&json!({ "content": [] })),
            Completion::text(EMPTY_RESPONSE_APOLOGY)
        );
        assert_eq!(
            parse_anthropic_response(&json!({})),
            Completion::text(EMPTY_RESPONSE_APOLOGY)
        );
    }

    #[tokio::test]
    async fn request_carries_anthropic_headers_and_shapes() {
        let (addr, mut requests) = serve_once(|| {
            respond_json(
                200,
                json!({ "stop_reason": "end_turn", "content": [{ "type": "text", "text": "Hi!" }] }),
            )
        })
        .await;
        let provider = AnthropicProvider::new(format!("http://{addr}"), Some("ak-default".into()));
        let tool = ToolDef {
            name: "getDate".into(),
            description: "Get Date".into(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        };

        let out = provider
            .complete(
                &[Message::system("be brief"), Message::user("hello")],
                &[tool],
                "claude-3-5-haiku-latest",
                None,
            )
            .await
            .unwrap();
        assert_eq!(out, Completion::text("Hi!"));

        let req = requests.recv().await.unwrap();
        assert_eq!(req.path, "/v1/messages");
        assert_eq!(req.header("x-api-key"), Some("ak-default"));
        assert_eq!(req.header("anthropic-version"), Some("2023-06-01"));
        assert_eq!(req.body["max_tokens"], 1024);
        assert_eq!(req.body["system"], "be brief");
        assert_eq!(req.body["messages"], json!([{ "role": "user", "content": "hello" }]));
        assert_eq!(req.body["tools"][0]["input_schema"]["type"], "object");
    }

    #[tokio::test]
    async fn non_success_status_is_a_backend_error() {
        let (addr, _requests) = serve_once(|| {
            respond_json(
                529,
                json!({ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } }),
            )
        })
        .await;
        let provider = AnthropicProvider::new(format!("http://{addr}"), Some("k".into()));
        let err = provider
            .complete(&[Message::user("hi")], &[], "claude-3-haiku-20240307", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Backend { status: 529, ref message, .. } if message == "Overloaded"));
    }

    #[tokio::test]
    async fn missing_key_is_reported() {
        let provider = AnthropicProvider::new("http://127.0.0.1:9", None);
        let err = provider
            .complete(&[Message::user("hi")], &[], "claude-3-haiku-20240307", Some(""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Anthropic API key is not set");
    }
}
