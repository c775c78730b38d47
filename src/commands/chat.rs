use std::io::Write;
use std::sync::Arc;

use anyhow::Context as _;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::AppError;
use crate::models::context::format_ttl;
use crate::models::{ChatMode, ClientConfig, Message, Role};
use crate::modules::chat::{ChatService, SubmitOutcome};
use crate::modules::LocalStore;

const HELP: &str = "Commands: /mode <classification|reasoning|freeform>, /context, /steps, /reset, /reload, /help, /quit";

/// A line typed at the chat prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Prompt(String),
    Mode(ChatMode),
    Context,
    Steps,
    Reset,
    Reload,
    Help,
    Quit,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return ReplCommand::Prompt(line.to_string());
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next().map(str::trim).unwrap_or_default();

        match name.as_str() {
            "mode" => match arg.parse::<ChatMode>() {
                Ok(mode) => ReplCommand::Mode(mode),
                Err(e) => ReplCommand::Invalid(e),
            },
            "context" => ReplCommand::Context,
            "steps" => ReplCommand::Steps,
            "reset" => ReplCommand::Reset,
            "reload" => ReplCommand::Reload,
            "help" | "?" => ReplCommand::Help,
            "quit" | "exit" | "q" => ReplCommand::Quit,
            other => ReplCommand::Invalid(format!("Unknown command: /{}", other)),
        }
    }
}

fn print_message(msg: &Message) {
    let who = match msg.role {
        Role::User => "you",
        Role::Agent => "agent",
    };
    println!("{}> {}", who, msg.text);
}

fn print_steps(steps: &[String]) {
    if steps.is_empty() {
        println!("No execution steps recorded yet.");
        return;
    }
    println!("Execution Trail:");
    for (idx, step) in steps.iter().enumerate() {
        println!("  {}. {}", idx + 1, step);
    }
}

fn print_context(service: &ChatService) {
    match service.conversation().context() {
        Some(ctx) => {
            println!("{}", ctx.summary_line());
            let large = if ctx.is_large() { "  [Large]" } else { "" };
            println!("Context size: {:.1} KB{}", ctx.size_kb(), large);
            println!("Expires in: {}", format_ttl(ctx.expires_in()));
            println!("{}", ctx.pretty());
        }
        None => println!("No member context loaded."),
    }
}

/// Interactive chat loop on stdin/stdout
pub async fn run_chat(config: ClientConfig, store: Arc<LocalStore>) -> anyhow::Result<()> {
    let mut mode = config.default_mode;
    let mut service = ChatService::new(&config, store)?;

    println!("Connecting to backend at {}...", config.base_url);
    if let Err(e) = service.authenticate().await {
        // Blocking state: nothing else works without a token
        println!("Unable to authenticate with backend");
        println!("{}", e);
        println!("Please contact support.");
        return Err(anyhow::anyhow!(e)).context("authentication failed");
    }

    println!("Session {} | mode: {}", service.conversation().session_id(), mode);
    println!("{}", HELP);
    for msg in service.conversation().messages() {
        print_message(msg);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", HELP),
            ReplCommand::Invalid(msg) => println!("{}", msg),
            ReplCommand::Mode(new_mode) => {
                mode = new_mode;
                println!("Use case: {}", mode);
            }
            ReplCommand::Context => print_context(&service),
            ReplCommand::Steps => {
                let steps = service
                    .conversation()
                    .messages()
                    .iter()
                    .rev()
                    .find_map(|m| m.steps.clone())
                    .unwrap_or_default();
                print_steps(&steps);
            }
            ReplCommand::Reset => {
                service.reset()?;
                println!("Conversation cleared. Session {}", service.conversation().session_id());
            }
            ReplCommand::Reload => match service.reload().await {
                Ok(()) => println!("Reconnected."),
                Err(e) => println!("Unable to authenticate with backend: {}", e),
            },
            ReplCommand::Prompt(text) => {
                if text.is_empty() {
                    continue;
                }

                print!("agent> ");
                std::io::stdout().flush()?;

                let mut shown = 0usize;
                let outcome = service
                    .submit(&text, mode, |frame| {
                        print!("{}", &frame[shown..]);
                        let _ = std::io::stdout().flush();
                        shown = frame.len();
                    })
                    .await;

                match outcome {
                    Ok(SubmitOutcome::Replied(_)) => println!(),
                    Ok(SubmitOutcome::Failed(e)) => println!("❌ {}", e),
                    Ok(SubmitOutcome::Ignored) => println!(),
                    Err(AppError::Auth(msg)) => {
                        println!();
                        println!("{}", msg);
                        println!("Type /reload to sign in again.");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    Ok(())
}
