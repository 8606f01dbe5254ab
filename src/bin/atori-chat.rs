//! Interactive chat application for conversing with Atori.
//!
//! This binary provides a streaming REPL interface for chatting with the
//! tsundere programmer persona over any OpenAI-compatible API.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings (reads ATORI_API_KEY)
//! atori-chat
//!
//! # Specify a model
//! atori-chat --model deepseek-ai/DeepSeek-V3
//!
//! # Replace the persona with a custom system prompt
//! atori-chat --system "You are a helpful coding assistant"
//!
//! # Keep only the last 4 messages per conversation
//! atori-chat --max-history 4
//!
//! # Disable colors (useful for piping output)
//! atori-chat --no-color
//! ```
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/clear` - Clear the active conversation's history
//! - `/model <name>` - Change the model
//! - `/system [prompt]` - Set or restore the system prompt
//! - `/history <n>` - Change the retention bound
//! - `/conversation <id>` - Switch conversations
//! - `/stats` - Show session statistics
//! - `/quit` - Exit the application

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use atori::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use atori::client::{ModelClient, OpenAi};
use atori::persona::{ASSISTANT_AVATAR, ASSISTANT_NAME, USER_AVATAR};

/// Main entry point for the atori-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, _) = ChatArgs::from_command_line_relaxed("atori-chat [OPTIONS]");
    let api_key = args.api_key.clone();
    let base_url = args.base_url.clone();
    let config = ChatConfig::from(args);
    let use_color = config.use_color;

    // Client construction happens before any session exists, so missing
    // credentials fail here and no turn can ever be attempted without them.
    let client = OpenAi::with_options(api_key, base_url, None)?;
    let mut session = ChatSession::new(client, config)?;

    // Flag for interrupt handling during streaming
    let interrupted = Arc::new(AtomicBool::new(false));
    let mut renderer = PlainTextRenderer::with_color(use_color).with_interrupt(interrupted.clone());
    let mut rl = DefaultEditor::new()?;

    // Set up Ctrl+C handler
    let interrupted_clone = interrupted.clone();
    ctrlc::set_handler(move || {
        interrupted_clone.store(true, Ordering::Relaxed);
    })?;

    println!(
        "{ASSISTANT_AVATAR} {ASSISTANT_NAME} (model: {}, conversation: {})",
        session.model(),
        session.conversation_id()
    );
    println!("Type /help for commands, /quit to exit\n");

    loop {
        // Reset interrupt flag before each input
        interrupted.store(false, Ordering::Relaxed);

        let readline = rl.readline(&format!("{USER_AVATAR} You: "));

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => match session.clear() {
                            Ok(_) => renderer.print_info("Conversation cleared."),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model) => {
                            session.set_model(model.clone());
                            renderer.print_info(&format!("Model changed to: {}", model));
                        }
                        ChatCommand::System(prompt) => {
                            let restored = prompt.is_none();
                            session.set_system_prompt(prompt.clone());
                            if restored {
                                renderer.print_info("System prompt restored to the persona.");
                            } else if let Some(p) = prompt {
                                renderer.print_info(&format!("System prompt set to: {}", p));
                            }
                        }
                        ChatCommand::MaxTokens(value) => {
                            session.set_max_tokens(value);
                            renderer.print_info(&format!("max_tokens set to {value}"));
                        }
                        ChatCommand::HistoryLimit(value) => match session.set_max_history(value) {
                            Ok(_) => renderer.print_info(&format!(
                                "History bound set to {value} messages per conversation"
                            )),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Conversation(id) => match session.switch_conversation(&id) {
                            Ok(_) => renderer.print_info(&format!(
                                "Switched to conversation {id} ({} messages)",
                                session.message_count()
                            )),
                            Err(err) => renderer.print_error(&err.to_string()),
                        },
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to API
                println!("{ASSISTANT_AVATAR} {ASSISTANT_NAME}:");
                if let Err(e) = session.send_streaming(line, &mut renderer).await {
                    renderer.print_error(&e.to_string());
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn print_stats<C: ModelClient>(session: &ChatSession<C>) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Conversation: {}", stats.conversation_id);
    println!("      Conversations: {}", stats.conversation_count);
    println!(
        "      Messages: {} (bound: {})",
        stats.message_count, stats.max_history
    );
    println!("      Max tokens: {}", stats.max_tokens);
    println!(
        "      Turns: {} completed / {} aborted",
        stats.turns_completed, stats.turns_aborted
    );
}
