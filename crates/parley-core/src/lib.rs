pub mod agents;
pub mod config;
pub mod error;
pub mod history;
pub mod providers;
pub mod tools;

pub use agents::{
    get_llm_response, llm_response_with, AgentTask, AgentTaskOptions, AgentTaskOutcome, ChatBot,
    ChatBotOptions, LlmRequestOptions, LoopOutcome, TaskStatus, ToolLoop,
};
pub use config::{CustomModelEntry, Credentials, ModelFamily, ParleyConfig, RoutedModel};
pub use error::{Error, Result};
pub use history::History;
pub use providers::provider::{Completion, FunctionCall, LlmProvider, Message, Role, ToolCall};
pub use providers::{
    AnthropicProvider, DeepSeekProvider, OpenAiProvider, RecordedRequest, ScriptedProvider,
};
pub use tools::{
    AnnotatedTool, BareTool, Callable, CustomIdentifier, GetDateTool, ParamSpec, ParamType, Tool,
    ToolArgs, ToolContext, ToolDef, ToolDescriptor, ToolRegistry, ToolResult, ToolSpec,
};
