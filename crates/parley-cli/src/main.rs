mod chat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use parley_core::{
    get_llm_response, AgentTask, AgentTaskOptions, ChatBot, ChatBotOptions, Credentials,
    LlmRequestOptions, ParleyConfig, TaskStatus, ToolRegistry,
};

#[derive(Parser)]
#[command(name = "parley", about = "Talk to an LLM that can call tools", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Model name; defaults to the configured model
    #[arg(short, long, global = true, env = "PARLEY_MODEL")]
    model: Option<String>,

    /// System message for the conversation
    #[arg(short, long, global = true, default_value = "")]
    system: String,

    /// Tool-bearing turns allowed before a final answer is forced
    #[arg(long, global = true)]
    max_tool_calls: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// One-shot question without tools
    Ask { message: String },
    /// Interactive conversation on stdin
    Chat,
    /// Run a task until the model marks it complete or failed
    Task { message: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = ParleyConfig::load()?;
    let credentials = Credentials::from_env();
    let model = cli.model.clone().unwrap_or_else(|| config.model.clone());

    match cli.command {
        Commands::Ask { message } => {
            let options = LlmRequestOptions {
                system_message: cli.system,
                model,
                ..LlmRequestOptions::new(message)
            };
            println!("{}", get_llm_response(options, &config, &credentials).await?);
        }
        Commands::Chat => {
            let options = ChatBotOptions {
                system_message: cli.system,
                model,
                max_tool_calls: cli.max_tool_calls.unwrap_or(config.max_tool_calls),
                max_history: config.max_history,
                ..ChatBotOptions::default()
            };
            let bot = ChatBot::new(options, ToolRegistry::with_test_tools()?, &config, &credentials)?;
            chat::run(bot).await?;
        }
        Commands::Task { message } => {
            let mut options = AgentTaskOptions {
                system_message: cli.system,
                model,
                max_history: config.max_history,
                ..AgentTaskOptions::new(message)
            };
            if let Some(n) = cli.max_tool_calls {
                options.max_tool_calls = n;
            }
            let task = AgentTask::new(options, &ToolRegistry::with_test_tools()?, &config, &credentials)?;
            let outcome = task.run().await?;
            if outcome.status != TaskStatus::Completed {
                eprintln!("[task {}]", status_label(outcome.status));
            }
            println!("{}", outcome.message);
        }
    }

    Ok(())
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "completed",
        TaskStatus::Failed => "failed",
        TaskStatus::TimedOut => "timed out",
    }
}
