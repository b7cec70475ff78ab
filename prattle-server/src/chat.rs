//! Chat session controller
//!
//! Owns the single current session. Handlers talk to it through
//! [`ChatCommand`]s; the controller task processes one command at a time,
//! which also serializes prompt submissions so an in-flight stream cannot
//! be interleaved with a second one.

use futures::StreamExt;
use prattle_core::session::{new_session_id, Session, SessionStore};
use tokio::sync::mpsc;
use tracing::{error, info};

use prattle_providers::{Assistant, Message};

use crate::state::{ChatCommand, ChatEvent};

const TITLE_MAX_CHARS: usize = 40;

/// Drives the current session: appends turns, streams replies, persists
pub struct ChatController {
    store: SessionStore,
    assistant: Assistant,
    current: Session,
}

impl ChatController {
    /// Create a controller with a fresh empty current session
    pub fn new(store: SessionStore, assistant: Assistant) -> Self {
        let current = Session::new(new_session_id());
        info!("Starting with session {}", current.id);
        Self {
            store,
            assistant,
            current,
        }
    }

    /// Id of the current session
    pub fn current_session_id(&self) -> &str {
        &self.current.id
    }

    /// Reset to a fresh empty session and return its id.
    ///
    /// Backs both "new" and "clear"; the two are identical.
    pub fn new_session(&mut self) -> String {
        self.current = Session::new(new_session_id());
        info!("Switched to new session {}", self.current.id);
        self.current.id.clone()
    }

    /// Replace the current session wholesale with a stored one
    pub fn load_session(&mut self, id: &str) -> prattle_core::Result<Session> {
        let session = self.store.load(id)?;
        self.current = session.clone();
        Ok(session)
    }

    /// Delete a stored session; deleting the current one immediately
    /// recreates a fresh session so there is always a current session.
    pub fn delete_session(&mut self, id: &str) {
        if let Err(e) = self.store.delete(id) {
            error!("Failed to delete session {}: {}", id, e);
        }
        if self.current.id == id {
            self.new_session();
        }
    }

    /// List stored sessions
    pub fn list_sessions(&self) -> Vec<prattle_core::session::SessionSummary> {
        self.store.list()
    }

    /// Append a user turn, stream the reply, persist on completion.
    ///
    /// Every fragment is forwarded on `events` as it arrives and also
    /// accumulated; once the stream ends the accumulated text becomes the
    /// assistant turn and the session is saved. Send failures are ignored
    /// so a vanished client never aborts generation or persistence.
    pub async fn submit_prompt(&mut self, prompt: String, events: &mpsc::UnboundedSender<ChatEvent>) {
        self.current.add_message("user", prompt);
        let title = self.derive_title();

        let history: Vec<Message> = self
            .current
            .messages
            .iter()
            .map(|m| Message::new(&m.role, &m.content))
            .collect();

        let mut stream = self.assistant.reply_stream(history).await;
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            reply.push_str(&fragment);
            let _ = events.send(ChatEvent::Chunk(fragment));
        }

        self.current.add_message("assistant", reply);
        if let Err(e) = self
            .store
            .save(&self.current.id, &title, &self.current.messages)
        {
            error!("Failed to persist session {}: {}", self.current.id, e);
        }

        let _ = events.send(ChatEvent::Done {
            session_id: self.current.id.clone(),
            title,
        });
    }

    // Recomputed on every submit from the first user message, never cached.
    fn derive_title(&self) -> String {
        self.current
            .messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.chars().take(TITLE_MAX_CHARS).collect())
            .unwrap_or_default()
    }

    /// Process commands until the channel closes
    pub async fn run(mut self, mut rx: mpsc::Receiver<ChatCommand>) {
        info!("Chat controller started");
        while let Some(cmd) = rx.recv().await {
            match cmd {
                ChatCommand::Ask { prompt, events } => {
                    self.submit_prompt(prompt, &events).await;
                }
                ChatCommand::NewSession { reply } => {
                    let _ = reply.send(self.new_session());
                }
                ChatCommand::LoadSession { id, reply } => {
                    let _ = reply.send(self.load_session(&id));
                }
                ChatCommand::DeleteSession { id, reply } => {
                    self.delete_session(&id);
                    let _ = reply.send(());
                }
                ChatCommand::ListSessions { reply } => {
                    let _ = reply.send(self.list_sessions());
                }
            }
        }
        info!("Chat controller channel closed, stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prattle_providers::{CompletionBackend, ProviderResult};
    use tempfile::TempDir;

    struct ScriptedBackend {
        fragments: Vec<&'static str>,
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(&self, _messages: Vec<Message>) -> ProviderResult<String> {
            Ok(self.fragments.concat())
        }

        async fn complete_stream(
            &self,
            _messages: Vec<Message>,
        ) -> ProviderResult<prattle_providers::FragmentStream> {
            let items: Vec<ProviderResult<String>> =
                self.fragments.iter().map(|f| Ok(f.to_string())).collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn controller(dir: &TempDir, fragments: Vec<&'static str>) -> ChatController {
        let store = SessionStore::new(dir.path());
        let assistant = Assistant::new(Box::new(ScriptedBackend { fragments }));
        ChatController::new(store, assistant)
    }

    async fn drain(
        rx: &mut mpsc::UnboundedReceiver<ChatEvent>,
    ) -> (String, Option<(String, String)>) {
        let mut reply = String::new();
        let mut done = None;
        while let Ok(event) = rx.try_recv() {
            match event {
                ChatEvent::Chunk(text) => reply.push_str(&text),
                ChatEvent::Done { session_id, title } => done = Some((session_id, title)),
            }
        }
        (reply, done)
    }

    #[test]
    fn test_new_session_yields_distinct_empty_sessions() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["hi"]);

        let first = controller.new_session();
        assert!(controller.current.messages.is_empty());
        let second = controller.new_session();
        assert!(controller.current.messages.is_empty());

        assert_ne!(first, second);
    }

    #[test]
    fn test_delete_current_recreates_session() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["hi"]);

        let before = controller.current_session_id().to_string();
        controller.delete_session(&before);
        let after = controller.current_session_id().to_string();

        assert_ne!(before, after);
        assert!(controller.current.messages.is_empty());
    }

    #[test]
    fn test_delete_other_keeps_current() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["hi"]);

        let current = controller.current_session_id().to_string();
        controller.delete_session("some-other-id");

        assert_eq!(controller.current_session_id(), current);
    }

    #[tokio::test]
    async fn test_submit_appends_streams_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["Hel", "lo ", "there"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        controller.submit_prompt("Hi".to_string(), &tx).await;

        let (reply, done) = drain(&mut rx).await;
        assert_eq!(reply, "Hello there");
        let (session_id, title) = done.unwrap();
        assert_eq!(session_id, controller.current_session_id());
        assert_eq!(title, "Hi");

        let stored = controller.store.load(&session_id).unwrap();
        assert_eq!(stored.title, "Hi");
        assert_eq!(stored.messages.len(), 2);
        assert_eq!(stored.messages[0].role, "user");
        assert_eq!(stored.messages[0].content, "Hi");
        assert_eq!(stored.messages[1].role, "assistant");
        assert_eq!(stored.messages[1].content, "Hello there");
    }

    #[tokio::test]
    async fn test_title_is_first_user_message_truncated_to_40_chars() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["ok"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let prompt = "Hello, how are you doing today my friend?";
        assert_eq!(prompt.chars().count(), 41);
        controller.submit_prompt(prompt.to_string(), &tx).await;

        let (_, done) = drain(&mut rx).await;
        let (_, title) = done.unwrap();
        assert_eq!(title, "Hello, how are you doing today my friend");
        assert_eq!(title.chars().count(), 40);
    }

    #[tokio::test]
    async fn test_title_stays_derived_from_first_user_message() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["ok"]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        controller.submit_prompt("First question".to_string(), &tx).await;
        controller.submit_prompt("Second question".to_string(), &tx).await;

        let (_, done) = drain(&mut rx).await;
        let (_, title) = done.unwrap();
        assert_eq!(title, "First question");

        let stored = controller
            .store
            .load(controller.current_session_id())
            .unwrap();
        assert_eq!(stored.title, "First question");
        assert_eq!(stored.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_submit_persists_even_when_client_vanished() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["lost reply"]);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        controller.submit_prompt("Hi".to_string(), &tx).await;

        let stored = controller
            .store
            .load(controller.current_session_id())
            .unwrap();
        assert_eq!(stored.messages[1].content, "lost reply");
    }

    #[tokio::test]
    async fn test_load_session_replaces_current_wholesale() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["reply"]);
        let (tx, _rx) = mpsc::unbounded_channel();

        controller.submit_prompt("Hi".to_string(), &tx).await;
        let saved_id = controller.current_session_id().to_string();

        controller.new_session();
        assert!(controller.current.messages.is_empty());

        let loaded = controller.load_session(&saved_id).unwrap();
        assert_eq!(loaded.id, saved_id);
        assert_eq!(controller.current_session_id(), saved_id);
        assert_eq!(controller.current.messages.len(), 2);
    }

    #[test]
    fn test_load_unknown_session_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut controller = controller(&dir, vec!["reply"]);

        let err = controller.load_session("missing").unwrap_err();
        assert!(matches!(err, prattle_core::Error::NotFound(_)));
    }
}
