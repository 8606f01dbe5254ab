//! Conversation history storage.
//!
//! `HistoryStore` maps conversation identifiers to ordered message
//! sequences. Entries are created lazily on first access and live for the
//! lifetime of the store, so a given id always resolves to the same
//! conversation and appends are visible to every later read of that id.
//!
//! The store does not enforce role alternation; the chat session owns that.
//! Empty or all-whitespace ids are rejected with a validation error.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::observability::HISTORY_TRUNCATIONS;
use crate::types::ChatMessage;

/// The ordered message history associated with one conversation id.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
        }
    }

    /// Returns the conversation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the messages in append order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns true if the conversation has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    fn retain_suffix(&mut self, max_messages: usize) -> bool {
        if self.messages.len() <= max_messages {
            return false;
        }
        let excess = self.messages.len() - max_messages;
        self.messages.drain(..excess);
        true
    }

    fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Per-process store of conversations, keyed by id.
#[derive(Debug, Default)]
pub struct HistoryStore {
    conversations: HashMap<String, Conversation>,
}

impl HistoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the conversation for `id`, creating an empty one on first
    /// access. The same id always resolves to the same entry.
    pub fn get_or_create(&mut self, id: &str) -> Result<&mut Conversation> {
        validate_id(id)?;
        Ok(self
            .conversations
            .entry(id.to_string())
            .or_insert_with(|| Conversation::new(id)))
    }

    /// Appends `message` to the end of the conversation for `id`.
    pub fn append(&mut self, id: &str, message: ChatMessage) -> Result<()> {
        self.get_or_create(id)?.push(message);
        Ok(())
    }

    /// Retains only the most recent `max_messages` messages of the
    /// conversation for `id`, dropping the oldest.
    ///
    /// The chat session applies this before every read-for-request so the
    /// prompt sent to the model stays bounded.
    pub fn truncate(&mut self, id: &str, max_messages: usize) -> Result<()> {
        if self.get_or_create(id)?.retain_suffix(max_messages) {
            HISTORY_TRUNCATIONS.click();
        }
        Ok(())
    }

    /// Removes all messages from the conversation for `id`. The entry itself
    /// survives, preserving identity for later appends.
    pub fn clear(&mut self, id: &str) -> Result<()> {
        self.get_or_create(id)?.clear();
        Ok(())
    }

    /// Returns the number of conversations ever created.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Returns the message count for `id` without creating an entry.
    pub fn message_count(&self, id: &str) -> usize {
        self.conversations
            .get(id)
            .map(Conversation::len)
            .unwrap_or(0)
    }
}

fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(Error::validation(
            "conversation id must not be empty",
            Some("conversation_id".to_string()),
        ))
    } else {
        Ok(())
    }
}
