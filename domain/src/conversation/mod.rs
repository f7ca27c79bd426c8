//! Conversation domain
//!
//! Message history handed to LLM providers, with value-copy forking.

pub mod entities;

pub use entities::{Conversation, Message, PromptLogEntry, Role};
