//! Conversation state.
//!
//! One [`ConversationState`] per logical conversation: an append-only
//! message log (truncated only by [`ConversationState::clear`]) and the most
//! recent candidate set from a place search.

use std::path::Path;

use tracing::{info, warn};

use plogger_core::types::{Message, MessageContent, Place, Role};

use crate::error::ChatError;

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    messages: Vec<Message>,
    candidates: Vec<Place>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message. Absent content is dropped with a warning.
    ///
    /// Returns whether the message was appended.
    pub fn append(&mut self, role: Role, content: Option<MessageContent>) -> bool {
        match content {
            Some(content) => {
                self.messages.push(Message { role, content });
                true
            }
            None => {
                warn!(role = %role, "Skipped appending message with no content");
                false
            }
        }
    }

    /// Snapshot of the message log.
    pub fn history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Empty the message log. Candidates are kept.
    pub fn clear(&mut self) {
        self.messages.clear();
        info!("Conversation history cleared");
    }

    /// Replace the candidate set wholesale.
    pub fn set_candidates(&mut self, candidates: Vec<Place>) {
        self.candidates = candidates;
    }

    /// Snapshot of the candidate set.
    pub fn candidates(&self) -> Vec<Place> {
        self.candidates.clone()
    }

    /// Write the message log to `path` as pretty-printed UTF-8 JSON.
    pub fn persist(&self, path: &Path) -> Result<(), ChatError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ChatError::Persist(format!("{}: {}", parent.display(), e)))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.messages)
            .map_err(|e| ChatError::Persist(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| ChatError::Persist(format!("{}: {}", path.display(), e)))?;
        info!(path = %path.display(), messages = self.messages.len(), "Conversation saved");
        Ok(())
    }

    /// Replace the message log with the one stored at `path`.
    ///
    /// On a missing or malformed file the current log is left untouched and
    /// the error is returned for the caller to report.
    pub fn restore(&mut self, path: &Path) -> Result<usize, ChatError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChatError::Restore(format!("{}: {}", path.display(), e)))?;
        let messages: Vec<Message> = serde_json::from_str(&raw)
            .map_err(|e| ChatError::Restore(format!("invalid JSON in {}: {}", path.display(), e)))?;
        self.messages = messages;
        info!(path = %path.display(), messages = self.messages.len(), "Conversation loaded");
        Ok(self.messages.len())
    }
}
