pub mod anthropic;
pub mod deepseek;
pub mod openai;
pub mod provider;
pub mod scripted;

#[cfg(test)]
pub(crate) mod test_server;

pub use anthropic::AnthropicProvider;
pub use deepseek::DeepSeekProvider;
pub use openai::OpenAiProvider;
pub use provider::{Completion, FunctionCall, LlmProvider, Message, Role, ToolCall};
pub use scripted::{RecordedRequest, ScriptedProvider};
