//! Chat application module for interactive conversations with Atori.
//!
//! This module provides a streaming REPL chat core built on top of the
//! atori client library:
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: per-turn orchestration and conversation state
//! - [`commands`]: slash command parsing
//!
//! The session drives one turn at a time: append the user message to the
//! conversation, bound the history, stream the model response through a
//! renderer, and commit the assistant message only on completion.

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use session::{ChatSession, SessionStats, TurnOutcome};
