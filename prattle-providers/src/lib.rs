//! LLM completion client for prattle
//!
//! This crate provides the completion backend abstraction, the
//! OpenAI-compatible HTTP client and the `Assistant` wrapper that owns
//! the persona prompt.

pub mod assistant;
pub mod base;
pub mod openai;

pub use assistant::Assistant;
pub use base::{CompletionBackend, FragmentStream, Message, ProviderError, ProviderResult};
pub use openai::OpenAiClient;
