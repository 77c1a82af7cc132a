use super::tool_loop::ToolLoop;
use crate::config::{Credentials, ParleyConfig};
use crate::error::{Error, Result};
use crate::history::History;
use crate::providers::provider::{LlmProvider, Message};
use crate::tools::registry::ToolRegistry;
use crate::tools::spec::AnnotatedTool;
use crate::tools::tool::{Callable, CustomIdentifier};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const MARK_COMPLETE: &str = "markComplete";
pub const MARK_FAILED: &str = "markFailed";

const BLOCKED_NUDGE: &str = "Message to user blocked: you must complete the task (preferred) or mark it as failed before responding to the user.  \n(The user will not see this message, so you'll need to repeat yourself if your last message included important information.)";

/// Options for [`AgentTask`]. Unknown keys are rejected when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AgentTaskOptions {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub system_message: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    /// Outer iterations before the task is abandoned as timed out.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default)]
    pub custom_identifier: Option<CustomIdentifier>,
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tool_calls() -> usize {
    25
}

fn default_max_history() -> usize {
    100
}

fn default_max_attempts() -> usize {
    10
}

impl Default for AgentTaskOptions {
    fn default() -> Self {
        Self {
            message: String::new(),
            system_message: String::new(),
            model: default_model(),
            api_key: None,
            max_tool_calls: default_max_tool_calls(),
            max_history: default_max_history(),
            max_attempts: default_max_attempts(),
            custom_identifier: None,
        }
    }
}

impl AgentTaskOptions {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Completed,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentTaskOutcome {
    pub message: String,
    pub status: TaskStatus,
    pub history: Vec<Message>,
}

/// Runs a task until the model marks it complete or failed.
///
/// Every [`AgentTask::run`] gets its own control flags and registry, so
/// runs of one task never observe each other's marks.
pub struct AgentTask {
    options: AgentTaskOptions,
    tool_loop: ToolLoop,
    tools: ToolRegistry,
}

/// Per-run completion flags.
#[derive(Default)]
struct ControlFlags {
    complete: Arc<AtomicBool>,
    failed: Arc<AtomicBool>,
}

impl ControlFlags {
    fn status(&self) -> Option<TaskStatus> {
        if self.failed.load(Ordering::SeqCst) {
            Some(TaskStatus::Failed)
        } else if self.complete.load(Ordering::SeqCst) {
            Some(TaskStatus::Completed)
        } else {
            None
        }
    }

    /// `tools` plus `markComplete` and `markFailed` wired to these flags.
    fn registry(&self, tools: &ToolRegistry) -> Result<ToolRegistry> {
        let mut registry = tools.clone();
        registry.register(
            AnnotatedTool::new(
                MARK_COMPLETE,
                set_flag(&self.complete, "Task completed, you may now reply to the user."),
            )
            .description("Mark the task as complete.  This MUST be done before responding to the user."),
        )?;
        registry.register(
            AnnotatedTool::new(
                MARK_FAILED,
                set_flag(&self.failed, "Task failed, you may now reply to the user."),
            )
            .description("Mark the task as failed"),
        )?;
        Ok(registry)
    }
}

impl AgentTask {
    /// Route `options.model` through `config`. Validation happens before any
    /// network activity.
    pub fn new(
        options: AgentTaskOptions,
        tools: &ToolRegistry,
        config: &ParleyConfig,
        credentials: &Credentials,
    ) -> Result<Self> {
        validate(&options)?;
        let routed = config.route(&options.model, credentials)?;
        let tool_loop = ToolLoop::new(routed.provider, routed.model);
        Self::build(options, tools, tool_loop)
    }

    pub fn with_provider(
        options: AgentTaskOptions,
        tools: &ToolRegistry,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        validate(&options)?;
        let tool_loop = ToolLoop::new(provider, options.model.clone());
        Self::build(options, tools, tool_loop)
    }

    fn build(options: AgentTaskOptions, tools: &ToolRegistry, tool_loop: ToolLoop) -> Result<Self> {
        for name in [MARK_COMPLETE, MARK_FAILED] {
            if tools.contains(name) {
                return Err(Error::config(format!(
                    "Tool name '{name}' is reserved for task control"
                )));
            }
        }

        let tool_loop = tool_loop
            .api_key(options.api_key.clone())
            .max_tool_calls(options.max_tool_calls)
            .max_history(Some(options.max_history));
        Ok(Self {
            options,
            tool_loop,
            tools: tools.clone(),
        })
    }

    pub async fn run(&self) -> Result<AgentTaskOutcome> {
        let flags = ControlFlags::default();
        let registry = flags.registry(&self.tools)?;

        let mut history = History::new();
        if !self.options.system_message.is_empty() {
            history.set_system_message(self.options.system_message.as_str());
        }
        history.add_message(Message::user(self.options.message.as_str()));

        let custom_identifier = self.options.custom_identifier.as_ref();
        let mut last_message = String::new();
        for attempt in 1..=self.options.max_attempts {
            debug!("Task attempt {}/{}", attempt, self.options.max_attempts);
            let outcome = self
                .tool_loop
                .run(&mut history, &registry, custom_identifier)
                .await?;

            let status = flags.status().or_else(|| {
                outcome.timed_out.then(|| {
                    warn!("Task ran out of tool calls without being marked complete or failed");
                    TaskStatus::TimedOut
                })
            });

            if let Some(status) = status {
                info!("Task finished after {} attempts: {:?}", attempt, status);
                return Ok(AgentTaskOutcome {
                    message: outcome.message,
                    status,
                    history: outcome.history,
                });
            }

            debug!("Task not marked yet, blocking the reply");
            last_message = outcome.message;
            history.add_message(Message::user(BLOCKED_NUDGE));
        }

        warn!(
            "Task abandoned after {} attempts without being marked complete or failed",
            self.options.max_attempts
        );
        Ok(AgentTaskOutcome {
            message: last_message,
            status: TaskStatus::TimedOut,
            history: history.get_history(Some(self.options.max_history)),
        })
    }
}

fn validate(options: &AgentTaskOptions) -> Result<()> {
    if options.message.is_empty() {
        return Err(Error::missing("message"));
    }
    Ok(())
}

fn set_flag(flag: &Arc<AtomicBool>, reply: &'static str) -> Callable {
    let flag = Arc::clone(flag);
    Callable::sync(move |_, _| {
        flag.store(true, Ordering::SeqCst);
        Ok(reply)
    })
}
