//! Slash command parsing for the chat application.
//!
//! Commands control the session locally and are never sent to the API.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Clear the active conversation's history.
    Clear,

    /// Change the model.
    Model(String),

    /// Set or restore the system prompt.
    /// `None` restores the built-in persona.
    System(Option<String>),

    /// Set the maximum tokens per response.
    MaxTokens(u32),

    /// Set the retention bound (messages kept per conversation).
    HistoryLimit(usize),

    /// Switch to (or create) another conversation.
    Conversation(String),

    /// Display session statistics.
    Stats,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" => ChatCommand::Clear,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "max_tokens" => match argument {
            Some(arg) => match arg.parse::<u32>() {
                Ok(value) => ChatCommand::MaxTokens(value),
                Err(_) => {
                    ChatCommand::Invalid("/max_tokens expects a positive integer".to_string())
                }
            },
            None => ChatCommand::Invalid("/max_tokens requires a value".to_string()),
        },
        "history" => match argument {
            Some(arg) => match arg.parse::<usize>() {
                Ok(value) if value >= 1 => ChatCommand::HistoryLimit(value),
                Ok(_) => ChatCommand::Invalid("/history expects a bound of at least 1".to_string()),
                Err(_) => ChatCommand::Invalid("/history expects a positive integer".to_string()),
            },
            None => ChatCommand::Invalid("/history requires a value".to_string()),
        },
        "conversation" | "conv" => match argument {
            Some(id) => ChatCommand::Conversation(id.to_string()),
            None => ChatCommand::Invalid("/conversation requires an id".to_string()),
        },
        "stats" | "status" => ChatCommand::Stats,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /clear                 Clear the active conversation's history
  /model <name>          Change the model
  /system [prompt]       Set system prompt (no argument restores the persona)
  /max_tokens <n>        Set maximum response tokens
  /history <n>           Set how many messages are kept per conversation
  /conversation <id>     Switch to (or create) another conversation
  /stats                 Show session statistics
  /help                  Show this help message
  /quit                  Exit the chat"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_quit_commands() {
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("/q"), Some(ChatCommand::Quit));
        assert_eq!(parse_command("  /quit  "), Some(ChatCommand::Quit));
    }

    #[test]
    fn parse_clear() {
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/CLEAR"), Some(ChatCommand::Clear));
    }

    #[test]
    fn parse_model() {
        assert_eq!(
            parse_command("/model deepseek-ai/DeepSeek-V3"),
            Some(ChatCommand::Model("deepseek-ai/DeepSeek-V3".to_string()))
        );
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid(
                "/model requires a model name".to_string()
            ))
        );
    }

    #[test]
    fn parse_system() {
        assert_eq!(
            parse_command("/system You are terse"),
            Some(ChatCommand::System(Some("You are terse".to_string())))
        );
        assert_eq!(parse_command("/system"), Some(ChatCommand::System(None)));
    }

    #[test]
    fn parse_history_limit() {
        assert_eq!(
            parse_command("/history 4"),
            Some(ChatCommand::HistoryLimit(4))
        );
        assert!(matches!(
            parse_command("/history 0"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("at least 1")
        ));
        assert!(matches!(
            parse_command("/history many"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("positive integer")
        ));
        assert!(matches!(
            parse_command("/history"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_conversation_switch() {
        assert_eq!(
            parse_command("/conversation conv-2"),
            Some(ChatCommand::Conversation("conv-2".to_string()))
        );
        assert_eq!(
            parse_command("/conv conv-2"),
            Some(ChatCommand::Conversation("conv-2".to_string()))
        );
        assert!(matches!(
            parse_command("/conversation"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("requires")
        ));
    }

    #[test]
    fn parse_max_tokens() {
        assert_eq!(
            parse_command("/max_tokens 512"),
            Some(ChatCommand::MaxTokens(512))
        );
        assert!(matches!(
            parse_command("/max_tokens lots"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("positive integer")
        ));
    }

    #[test]
    fn unknown_command_reported() {
        assert!(matches!(
            parse_command("/teleport"),
            Some(ChatCommand::Invalid(msg)) if msg.contains("/teleport")
        ));
    }

    #[test]
    fn non_commands() {
        assert_eq!(parse_command("Hello, Atori!"), None);
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("  "), None);
    }

    #[test]
    fn help_text_not_empty() {
        let help = help_text();
        assert!(help.contains("/quit"));
        assert!(help.contains("/clear"));
        assert!(help.contains("/history"));
        assert!(help.contains("/conversation"));
    }
}
