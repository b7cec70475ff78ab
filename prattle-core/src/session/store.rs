//! File-backed session store
//!
//! One JSON file per session at `<conversations_dir>/<id>.json`. Saving an
//! existing session preserves its original title and creation time and only
//! replaces the message list, so the title shown in listings never drifts
//! once a conversation is underway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ChatMessage, Session};

/// Summary of a stored session, as returned by [`SessionStore::list`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session id
    pub id: String,
    /// Session title
    pub title: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Stores sessions as JSON files in a directory
#[derive(Debug, Clone)]
pub struct SessionStore {
    conversations_dir: PathBuf,
}

impl SessionStore {
    /// Create a new store rooted at the given directory
    pub fn new<P: AsRef<Path>>(conversations_dir: P) -> Self {
        Self {
            conversations_dir: conversations_dir.as_ref().to_path_buf(),
        }
    }

    /// List stored sessions, sorted by filename descending.
    ///
    /// Ids are random tokens, so this order only approximates recency.
    /// Entries that are not valid session files are skipped.
    pub fn list(&self) -> Vec<SessionSummary> {
        let mut ids = Vec::new();

        if let Ok(entries) = std::fs::read_dir(&self.conversations_dir) {
            for entry in entries.flatten() {
                if let Some(name) = entry.file_name().to_str() {
                    if let Some(id) = name.strip_suffix(".json") {
                        ids.push(id.to_string());
                    }
                }
            }
        }

        ids.sort_by(|a, b| b.cmp(a));

        let mut sessions = Vec::new();
        for id in ids {
            match self.read_session(&id) {
                Some(session) => sessions.push(SessionSummary {
                    id: session.id,
                    title: session.title,
                    created_at: session.created_at,
                }),
                None => debug!("Skipping unreadable session file for id {}", id),
            }
        }
        sessions
    }

    /// Load a full session by id
    pub fn load(&self, id: &str) -> crate::Result<Session> {
        let path = self.session_path(id);
        if !path.exists() {
            return Err(crate::Error::NotFound(format!("session {}", id)));
        }

        let content = std::fs::read_to_string(&path)?;
        let session = serde_json::from_str(&content)?;
        Ok(session)
    }

    /// Save a session, creating or updating its file.
    ///
    /// If a file for `id` already exists, its original title and creation
    /// time are preserved and only the messages are replaced. Otherwise a
    /// new record is written with the given title and the current time.
    pub fn save(&self, id: &str, title: &str, messages: &[ChatMessage]) -> crate::Result<()> {
        std::fs::create_dir_all(&self.conversations_dir)?;
        let path = self.session_path(id);

        let session = match self.read_session(id) {
            Some(existing) => Session {
                id: id.to_string(),
                title: existing.title,
                created_at: existing.created_at,
                messages: messages.to_vec(),
            },
            None => Session {
                id: id.to_string(),
                title: title.to_string(),
                created_at: Utc::now(),
                messages: messages.to_vec(),
            },
        };

        let content = serde_json::to_string_pretty(&session)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Delete a session file. Deleting an unknown id is not an error.
    pub fn delete(&self, id: &str) -> crate::Result<bool> {
        let path = self.session_path(id);
        if path.exists() {
            std::fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_session(&self, id: &str) -> Option<Session> {
        let path = self.session_path(id);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn session_path(&self, id: &str) -> PathBuf {
        self.conversations_dir.join(format!("{}.json", id))
    }
}
