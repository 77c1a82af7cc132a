use anyhow::Result;
use parley_core::{ChatBot, Role};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

const HELP: &str = "Commands: /history, /clear, /system <text>, /quit";

/// Line-based REPL. Backend errors are reported and the conversation goes on.
pub async fn run(mut bot: ChatBot) -> Result<()> {
    println!("parley chat. {HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line {
            "/quit" | "/exit" => break,
            "/help" => println!("{HELP}"),
            "/clear" => {
                bot.set_history(Default::default());
                println!("(history cleared)");
            }
            "/history" => print_history(&bot),
            _ if line.starts_with("/system ") => {
                bot.set_system_message(line["/system ".len()..].trim());
                println!("(system message updated)");
            }
            _ => match bot.send_message(line).await {
                Ok(answer) => println!("{answer}"),
                Err(e) => {
                    error!("{e}");
                    eprintln!("error: {e}");
                }
            },
        }
    }
    Ok(())
}

fn print_history(bot: &ChatBot) {
    for msg in bot.history().messages() {
        let role = match msg.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        match &msg.tool_calls {
            Some(calls) => {
                for call in calls {
                    println!("[{role}] -> {}({})", call.name(), call.function.arguments);
                }
            }
            None => println!("[{role}] {}", msg.content),
        }
    }
}
