//! Configuration types for the chat application.
//!
//! CLI arguments are parsed via `arrrg`; `ChatConfig` holds the resolved
//! values after defaults are applied.

use arrrg_derive::CommandLine;

use crate::error::{Error, Result};
use crate::persona;

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "deepseek-ai/DeepSeek-V3";

/// Default maximum tokens per response.
const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Default retention bound: messages kept per conversation.
///
/// History is always bounded; every prompt carries at most this many prior
/// messages, so cost and context-window use stay flat as a conversation ages.
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Conversation id used when none is given.
const DEFAULT_CONVERSATION_ID: &str = "conv-1";

/// Command-line arguments for the atori-chat tool.
#[derive(CommandLine, Debug, Default, Eq, PartialEq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use (default: deepseek-ai/DeepSeek-V3)", "MODEL")]
    pub model: Option<String>,

    /// System prompt replacing the built-in persona.
    #[arrrg(optional, "System prompt replacing the built-in persona", "PROMPT")]
    pub system: Option<String>,

    /// Maximum tokens per response.
    #[arrrg(optional, "Max tokens per response (default: 1024)", "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Retention bound on messages kept per conversation.
    #[arrrg(
        optional,
        "Max history messages kept per conversation (default: 10)",
        "COUNT"
    )]
    pub max_history: Option<u32>,

    /// Sampling temperature, parsed during config resolution so the
    /// argument struct stays `Eq`.
    #[arrrg(optional, "Sampling temperature 0.0-1.0", "TEMP")]
    pub temperature: Option<String>,

    /// API base URL.
    #[arrrg(
        optional,
        "API base URL (default: https://api.siliconflow.cn/v1/)",
        "URL"
    )]
    pub base_url: Option<String>,

    /// API key.
    #[arrrg(optional, "API key (default: ATORI_API_KEY environment)", "KEY")]
    pub api_key: Option<String>,

    /// Conversation id to start in.
    #[arrrg(optional, "Conversation id to start in (default: conv-1)", "ID")]
    pub conversation: Option<String>,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: String,

    /// System prompt sent with every request.
    pub system_prompt: String,

    /// Maximum tokens per response.
    pub max_tokens: u32,

    /// Retention bound: at most this many messages are kept per
    /// conversation. Must be at least 1 so the current user message always
    /// survives truncation.
    pub max_history: usize,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,

    /// The active conversation id.
    pub conversation_id: String,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values: the built-in persona,
    /// the default model, a 10-message history bound, and colors on.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system_prompt: persona::PERSONA.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_history: DEFAULT_MAX_HISTORY,
            temperature: None,
            conversation_id: DEFAULT_CONVERSATION_ID.to_string(),
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the maximum tokens per response.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Sets the retention bound.
    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history;
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the starting conversation id.
    pub fn with_conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = id.into();
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Checks option values that have constraints.
    pub fn validate(&self) -> Result<()> {
        if self.max_history == 0 {
            return Err(Error::validation(
                "retention bound must be at least 1",
                Some("max_history".to_string()),
            ));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(Error::validation(
                "conversation id must not be empty",
                Some("conversation_id".to_string()),
            ));
        }
        Ok(())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl From<ChatArgs> for ChatConfig {
    fn from(args: ChatArgs) -> Self {
        let defaults = ChatConfig::new();
        ChatConfig {
            model: args.model.unwrap_or(defaults.model),
            system_prompt: args.system.unwrap_or(defaults.system_prompt),
            max_tokens: args.max_tokens.unwrap_or(defaults.max_tokens),
            max_history: args
                .max_history
                .map(|m| m as usize)
                .unwrap_or(defaults.max_history),
            temperature: args.temperature.and_then(|t| t.parse().ok()),
            conversation_id: args.conversation.unwrap_or(defaults.conversation_id),
            use_color: !args.no_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.system_prompt, persona::PERSONA);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_history, 10);
        assert_eq!(config.conversation_id, "conv-1");
        assert!(config.temperature.is_none());
        assert!(config.use_color);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from(ChatArgs::default());
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("deepseek-ai/DeepSeek-V2.5".to_string()),
            system: Some("You are terse.".to_string()),
            max_tokens: Some(2048),
            max_history: Some(4),
            temperature: Some("0.7".to_string()),
            conversation: Some("pair-review".to_string()),
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::from(args);
        assert_eq!(config.model, "deepseek-ai/DeepSeek-V2.5");
        assert_eq!(config.system_prompt, "You are terse.");
        assert_eq!(config.max_tokens, 2048);
        assert_eq!(config.max_history, 4);
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.conversation_id, "pair-review");
        assert!(!config.use_color);
    }

    #[test]
    fn unparsable_temperature_falls_back_to_default() {
        let args = ChatArgs {
            temperature: Some("warm".to_string()),
            ..ChatArgs::default()
        };
        let config = ChatConfig::from(args);
        assert!(config.temperature.is_none());
    }

    #[test]
    fn zero_retention_bound_rejected() {
        let config = ChatConfig::new().with_max_history(0);
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn blank_conversation_id_rejected() {
        let config = ChatConfig::new().with_conversation_id("  ");
        assert!(config.validate().unwrap_err().is_validation());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model("m")
            .with_system_prompt("s")
            .with_max_tokens(64)
            .with_max_history(2)
            .with_temperature(Some(0.3))
            .with_conversation_id("c")
            .without_color();
        assert_eq!(config.model, "m");
        assert_eq!(config.system_prompt, "s");
        assert_eq!(config.max_tokens, 64);
        assert_eq!(config.max_history, 2);
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.conversation_id, "c");
        assert!(!config.use_color);
    }
}
