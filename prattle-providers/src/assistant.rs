//! The assistant wrapper
//!
//! Composes the fixed persona system prompt with the conversation history
//! and converts provider faults into visible reply text. Callers above
//! this boundary never see a provider error: the failure arrives as an
//! `"Error: ..."` reply, the same way any other assistant message does.

use futures::stream::{self, Stream, StreamExt};
use std::pin::Pin;
use tracing::error;

use crate::base::{CompletionBackend, Message};

/// Reply fragments in generation order. Finite and not restartable.
pub type ReplyStream = Pin<Box<dyn Stream<Item = String> + Send>>;

const SYSTEM_PROMPT: &str = "\
You are Prattle, a friendly and capable AI assistant.\n\
\n\
When someone asks who you are or what you can do, introduce yourself \
briefly: you help with answering questions, writing, coding, planning, \
learning new things, or just having a conversation.\n\
\n\
Keep replies warm, clear and to the point. Use plain language, and ask \
a short clarifying question when a request is ambiguous.";

/// Owns the persona prompt and a completion backend
pub struct Assistant {
    backend: Box<dyn CompletionBackend>,
    system_prompt: String,
}

impl Assistant {
    /// Create an assistant with the default persona
    pub fn new(backend: Box<dyn CompletionBackend>) -> Self {
        Self {
            backend,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Create an assistant with a custom persona prompt
    pub fn with_system_prompt(
        backend: Box<dyn CompletionBackend>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            system_prompt: system_prompt.into(),
        }
    }

    fn compose(&self, history: Vec<Message>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(&self.system_prompt));
        messages.extend(history);
        messages
    }

    /// Produce the whole reply for the given history.
    ///
    /// Provider failures come back as `"Error: ..."` reply text.
    pub async fn reply(&self, history: Vec<Message>) -> String {
        match self.backend.complete(self.compose(history)).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("Completion failed: {}", err);
                format!("Error: {}", err)
            }
        }
    }

    /// Produce the reply as a stream of text fragments.
    ///
    /// A provider fault, whether on connect or mid-stream, is surfaced as
    /// a single terminal `"Error: ..."` fragment.
    pub async fn reply_stream(&self, history: Vec<Message>) -> ReplyStream {
        let inner = match self.backend.complete_stream(self.compose(history)).await {
            Ok(inner) => inner,
            Err(err) => {
                error!("Streaming completion failed: {}", err);
                let message = format!("Error: {}", err);
                return Box::pin(stream::once(async move { message }));
            }
        };

        Box::pin(stream::unfold(Some(inner), |state| async move {
            let mut inner = state?;
            match inner.next().await {
                Some(Ok(fragment)) => Some((fragment, Some(inner))),
                Some(Err(err)) => {
                    error!("Streaming completion failed mid-stream: {}", err);
                    Some((format!("Error: {}", err), None))
                }
                None => None,
            }
        }))
    }
}
