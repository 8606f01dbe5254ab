//! Request and wire types for the OpenAI-compatible chat completions API.

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, Role};

/// A model request as assembled by the chat session.
///
/// `history` holds the prior turns of the conversation; `input` is the new
/// user message and is carried separately so it can never be duplicated
/// inside the history. The wire serialization always orders messages as
/// system, then history, then input.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Model identifier, e.g. `deepseek-ai/DeepSeek-V3`.
    pub model: String,

    /// System persona text, prepended to every request.
    pub system: String,

    /// Prior conversation turns, excluding the new input.
    pub history: Vec<ChatMessage>,

    /// The new user input for this turn.
    pub input: String,

    /// Optional cap on response tokens.
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Flattens the request into wire messages in the order the model
    /// expects: system, prior history, new input.
    pub fn wire_messages(&self) -> Vec<WireMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(WireMessage::system(&self.system));
        for message in &self.history {
            messages.push(WireMessage::from(message));
        }
        messages.push(WireMessage::user(&self.input));
        messages
    }
}

/// A role-tagged message as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    /// Wire role: `system`, `user`, or `assistant`.
    pub role: String,

    /// Message text.
    pub content: String,
}

impl WireMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

/// The JSON body of a `POST /chat/completions` request.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatCompletionRequest {
    /// Model identifier.
    pub model: String,

    /// Ordered wire messages.
    pub messages: Vec<WireMessage>,

    /// Whether to stream the response as SSE.
    pub stream: bool,

    /// Optional cap on response tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Optional sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChatCompletionRequest {
    /// Builds a streaming request body from a `ChatRequest`.
    pub fn streaming(request: &ChatRequest) -> Self {
        Self {
            model: request.model.clone(),
            messages: request.wire_messages(),
            stream: true,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

/// One `chat.completion.chunk` object from the SSE stream.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatCompletionChunk {
    /// Candidate deltas; the API sends exactly one choice per chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

impl ChatCompletionChunk {
    /// Extracts the text fragment from this chunk, if it carries one.
    pub fn fragment(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
    }
}

/// A single streamed choice.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChunkChoice {
    /// The incremental content delta.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Set on the final chunk of a choice, e.g. `stop`.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The incremental payload of a streamed choice.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ChunkDelta {
    /// New response text, absent on role-only and final chunks.
    #[serde(default)]
    pub content: Option<String>,
}
