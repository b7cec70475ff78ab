//! Conversation sessions
//!
//! A session is one persisted conversation: an opaque id, a title derived
//! from the first user message, a creation time and an ordered message
//! list. Sessions are stored as one JSON file each, see [`store`].

pub mod store;

pub use store::{SessionStore, SessionSummary};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role (system, user, assistant)
    pub role: String,
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// A conversation session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session id, also the storage filename stem
    pub id: String,
    /// Title derived from the first user message
    pub title: String,
    /// Session creation time
    pub created_at: DateTime<Utc>,
    /// Messages in the session, append-only while current
    pub messages: Vec<ChatMessage>,
}

impl Session {
    /// Create a new empty session
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// Add a message to the session
    pub fn add_message(&mut self, role: impl Into<String>, content: impl Into<String>) {
        self.messages.push(ChatMessage::new(role, content));
    }
}

/// Generate a short opaque session id.
///
/// Ids are random, not time-ordered; listing sorted by id therefore gives
/// no real chronological guarantee.
pub fn new_session_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..8].to_string()
}
