//! Core types for prattle
//!
//! This crate provides the conversation data model, the file-backed
//! session store, configuration and logging used by the other prattle
//! components.

pub mod config;
pub mod error;
pub mod logging;
pub mod session;

pub use error::{Error, Result};
