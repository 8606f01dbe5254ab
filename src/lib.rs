// Public modules
pub mod chat;
pub mod client;
pub mod error;
pub mod history;
pub mod observability;
pub mod persona;
pub mod render;
pub mod types;

// Re-exports
pub use client::{FragmentStream, ModelClient, OpenAi};
pub use error::{Error, Result};
pub use history::{Conversation, HistoryStore};
pub use render::{PlainTextRenderer, Renderer};
pub use types::*;
