//! Web chat server for prattle
//!
//! Exposes the chat routes over axum, relays completion fragments to the
//! browser as server-sent events and drives the single current session
//! through a command-processing controller task.

pub mod chat;
pub mod handlers;
pub mod server;
pub mod state;

pub use chat::ChatController;
pub use server::{app, run_server};
pub use state::{AppState, ChatCommand, ChatEvent};
