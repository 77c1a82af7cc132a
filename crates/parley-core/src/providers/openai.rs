use super::provider::{Completion, LlmProvider, Message, ToolCall};
use crate::error::{Error, Result};
use crate::tools::tool::ToolDef;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    keyless: bool,
}

impl OpenAiProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key,
            keyless: false,
        }
    }

    /// Bound every request to `timeout` of wall-clock time.
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
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "OpenAI"
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

/// Per-call key first, then the provider default. Empty keys count as
/// missing, which is an error unless the provider is `keyless`.
pub(crate) fn resolve_key<'a>(
    provider: &str,
    call_key: Option<&'a str>,
    default_key: Option<&'a str>,
    keyless: bool,
) -> Result<Option<&'a str>> {
    let key = call_key
        .filter(|k| !k.is_empty())
        .or(default_key.filter(|k| !k.is_empty()));
    if key.is_none() && !keyless {
        return Err(Error::MissingCredential {
            provider: provider.to_string(),
        });
    }
    Ok(key)
}

pub(crate) fn build_tools(tools: &[ToolDef]) -> Vec<Value> {
    tools.iter().map(ToolDef::to_function_json).collect()
}

/// One round-trip against an OpenAI-compatible `chat/completions` endpoint.
pub(crate) async fn chat_completion(
    client: &Client,
    provider: &str,
    url: &str,
    api_key: Option<&str>,
    messages: &[Message],
    tools: &[ToolDef],
    model: &str,
) -> Result<Completion> {
    let mut body = json!({ "model": model, "messages": messages });
    let tools_val = build_tools(tools);
    if !tools_val.is_empty() {
        body["tools"] = json!(tools_val);
    }

    debug!("{} request: {} messages, {} tools", provider, messages.len(), tools.len());
    let mut req = client.post(url).json(&body);
    if let Some(key) = api_key {
        req = req.bearer_auth(key);
    }
    let resp = req.send().await?;
    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(backend_error(provider, status.as_u16(), &text));
    }
    let data: Value = resp.json().await?;
    parse_chat_completion(provider, &data)
}

pub(crate) fn parse_chat_completion(provider: &str, data: &Value) -> Result<Completion> {
    let message = &data["choices"][0]["message"];
    if !message.is_object() {
        return Err(Error::MalformedResponse {
            provider: provider.to_string(),
            detail: "missing choices[0].message".to_string(),
        });
    }
    let content = message["content"].as_str().unwrap_or("").to_string();
    let calls = match &message["tool_calls"] {
        Value::Array(_) => serde_json::from_value::<Vec<ToolCall>>(message["tool_calls"].clone())
            .map_err(|e| Error::MalformedResponse {
                provider: provider.to_string(),
                detail: format!("bad tool_calls: {e}"),
            })?,
        _ => Vec::new(),
    };
    Ok(Completion::tool_calls(content, calls))
}

/// Prefer the provider's `error.message`, fall back to the raw body.
pub(crate) fn backend_error(provider: &str, status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    Error::Backend {
        provider: provider.to_string(),
        status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_server::{respond_json, serve_once};

    fn weather_tool() -> ToolDef {
        ToolDef {
            name: "getWeather".into(),
            description: "Get Weather".into(),
            parameters: json!({ "type": "object", "properties": {}, "required": [] }),
        }
    }

    #[tokio::test]
    async fn plain_answer_and_request_shape() {
        let (addr, mut requests) = serve_once(|| {
            respond_json(200, json!({ "choices": [{ "message": { "role": "assistant", "content": "Hello!" } }] }))
        })
        .await;
        let provider = OpenAiProvider::new(format!("http://{addr}/v1"), Some("sk-default".into()));

        let out = provider
            .complete(&[Message::user("hi")], &[], "gpt-4o-mini", None)
            .await
            .unwrap();
        assert_eq!(out, Completion::text("Hello!"));

        let req = requests.recv().await.unwrap();
        assert_eq!(req.path, "/v1/chat/completions");
        assert_eq!(req.header("authorization"), Some("Bearer sk-default"));
        assert_eq!(req.body["model"], "gpt-4o-mini");
        assert_eq!(req.body["messages"][0], json!({ "role": "user", "content": "hi" }));
        assert!(req.body.get("tools").is_none());
    }

    #[tokio::test]
    async fn tool_calls_are_returned_and_call_key_wins() {
        let (addr, mut requests) = serve_once(|| {
            respond_json(
                200,
                json!({ "choices": [{ "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": { "name": "getWeather", "arguments": "{}" }
                    }]
                } }] }),
            )
        })
        .await;
        let provider = OpenAiProvider::new(format!("http://{addr}/v1"), Some("sk-default".into()));

        let out = provider
            .complete(&[Message::user("weather?")], &[weather_tool()], "gpt-4o", Some("sk-call"))
            .await
            .unwrap();
        assert_eq!(out.message, "");
        assert_eq!(out.tool_calls.unwrap()[0].name(), "getWeather");

        let req = requests.recv().await.unwrap();
        assert_eq!(req.header("authorization"), Some("Bearer sk-call"));
        assert_eq!(req.body["tools"][0]["type"], "function");
        assert_eq!(req.body["tools"][0]["function"]["name"], "getWeather");
    }

    #[tokio::test]
    async fn non_success_status_carries_provider_message() {
        let (addr, _requests) = serve_once(|| {
            respond_json(401, json!({ "error": { "message": "Incorrect API key provided" } }))
        })
        .await;
        let provider = OpenAiProvider::new(format!("http://{addr}/v1"), Some("bad".into()));

        let err = provider
            .complete(&[Message::user("hi")], &[], "gpt-4o-mini", None)
            .await
            .unwrap_err();
        match err {
            Error::Backend { provider, status, message } => {
                assert_eq!(provider, "OpenAI");
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_message_is_malformed() {
        let (addr, _requests) = serve_once(|| respond_json(200, json!({ "choices": [] }))).await;
        let provider = OpenAiProvider::new(format!("http://{addr}/v1"), Some("k".into()));

        let err = provider
            .complete(&[Message::user("hi")], &[], "gpt-4o-mini", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let provider = OpenAiProvider::new("http://127.0.0.1:9", None);
        let err = provider
            .complete(&[Message::user("hi")], &[], "gpt-4o-mini", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCredential { ref provider } if provider == "OpenAI"));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn keyless_provider_sends_no_authorization() {
        let (addr, mut requests) = serve_once(|| {
            respond_json(200, json!({ "choices": [{ "message": { "content": "local" } }] }))
        })
        .await;
        let provider = OpenAiProvider::new(format!("http://{addr}/v1"), Some(String::new())).keyless();

        let out = provider
            .complete(&[Message::user("hi")], &[], "llama3.2", None)
            .await
            .unwrap();
        assert_eq!(out.message, "local");

        let req = requests.recv().await.unwrap();
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn empty_tool_call_array_is_no_tool_calls() {
        let data = json!({ "choices": [{ "message": { "content": "done", "tool_calls": [] } }] });
        let out = parse_chat_completion("OpenAI", &data).unwrap();
        assert_eq!(out, Completion::text("done"));
    }

    #[test]
    fn non_json_error_body_is_kept_verbatim() {
        let err = backend_error("OpenAI", 502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "OpenAI API Error: Bad Gateway (status: 502)");
    }
}
