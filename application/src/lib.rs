//! Application layer for xpilot
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::ExecutionParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    error_handler::{ErrorHandler, LlmErrorKind},
    persistence::{FilePersistence, INPUT_REQUIRED_MARKER, PersistenceError},
    provider::{Completion, ProviderAdapter, ProviderError, SendOptions},
    stream_sink::{ChannelStreamSink, NoStreamSink, StreamEvent, StreamSink},
    template::{TemplateError, TemplateRenderer},
};
pub use use_cases::invoke_llm::{ApiError, InvokeOptions, LlmClient};
pub use use_cases::plan_project::{PlanningError, TechLead};
pub use use_cases::review_change::{
    AgentResponse, CodeReviewer, InputRequired, ReviewError, ReviewOutcome, ReviewRequest,
};
