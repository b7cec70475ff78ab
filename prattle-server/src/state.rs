use prattle_core::session::{Session, SessionSummary};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Shared handler state: a sender into the chat controller task
#[derive(Clone)]
pub struct AppState {
    pub chat_tx: mpsc::Sender<ChatCommand>,
}

/// Commands processed by the chat controller, one at a time
pub enum ChatCommand {
    /// Submit a prompt; fragments and the final summary arrive on `events`
    Ask {
        prompt: String,
        events: mpsc::UnboundedSender<ChatEvent>,
    },
    /// Start a fresh empty session, returning its id
    NewSession { reply: oneshot::Sender<String> },
    /// Replace the current session with a stored one
    LoadSession {
        id: String,
        reply: oneshot::Sender<prattle_core::Result<Session>>,
    },
    /// Delete a stored session
    DeleteSession {
        id: String,
        reply: oneshot::Sender<()>,
    },
    /// List stored sessions
    ListSessions {
        reply: oneshot::Sender<Vec<SessionSummary>>,
    },
}

/// Events emitted while answering a prompt
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// One reply fragment
    Chunk(String),
    /// Stream finished; the session has been persisted
    Done { session_id: String, title: String },
}

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub id: String,
}
