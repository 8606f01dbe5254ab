//! Data types shared across the crate.

mod completion;
mod message;

pub use completion::{
    ChatCompletionChunk, ChatCompletionRequest, ChatRequest, ChunkChoice, ChunkDelta, WireMessage,
};
pub use message::{ChatMessage, Role};
