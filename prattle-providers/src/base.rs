//! Base trait for completion backends

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use thiserror::Error;

/// Error type for provider operations
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A finite, non-restartable sequence of reply text fragments in
/// generation order.
pub type FragmentStream = Pin<Box<dyn Stream<Item = ProviderResult<String>> + Send>>;

/// A message in the chat conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    /// Create a message with an arbitrary role
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

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// Trait for completion backends
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Request a whole completion for the given messages
    async fn complete(&self, messages: Vec<Message>) -> ProviderResult<String>;

    /// Request a streaming completion.
    ///
    /// Default behavior falls back to non-streaming completion and emits
    /// the whole reply as a single fragment.
    async fn complete_stream(&self, messages: Vec<Message>) -> ProviderResult<FragmentStream> {
        let reply = self.complete(messages).await?;

        let mut fragments = Vec::new();
        if !reply.is_empty() {
            fragments.push(Ok(reply));
        }

        Ok(Box::pin(stream::iter(fragments)))
    }
}
