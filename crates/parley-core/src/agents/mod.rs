pub mod agent_task;
pub mod chatbot;
pub mod tool_loop;

pub use agent_task::{AgentTask, AgentTaskOptions, AgentTaskOutcome, TaskStatus};
pub use chatbot::{get_llm_response, llm_response_with, ChatBot, ChatBotOptions, LlmRequestOptions};
pub use tool_loop::{LoopOutcome, ToolLoop};
