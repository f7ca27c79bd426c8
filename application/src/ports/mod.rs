//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod error_handler;
pub mod persistence;
pub mod provider;
pub mod stream_sink;
pub mod template;
