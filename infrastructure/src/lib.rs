//! Infrastructure layer for xpilot
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: HTTP provider adapters, configuration file
//! loading, template rendering, file persistence and request logging.

pub mod config;
pub mod logging;
pub mod persistence;
pub mod providers;
pub mod templates;

// Re-export commonly used types
pub use config::{ConfigError, ConfigIssue, ConfigLoader, FileConfig, Severity};
pub use logging::JsonlConversationLogger;
pub use persistence::LocalFileStore;
pub use providers::{AnthropicProvider, OpenAiProvider, create_provider};
pub use templates::BuiltinTemplates;
