//! Provider adapter port
//!
//! Defines the single low-level contract every LLM backend adapter satisfies:
//! send a conversation, get back content and token counts. Retry policy lives
//! in the request engine, never in adapters.

use crate::ports::stream_sink::StreamSink;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use xpilot_domain::{Conversation, Model, ProviderKind};

/// Errors surfaced by provider adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// HTTP 429. Headers are kept so the adapter can derive a backoff.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        headers: HashMap<String, String>,
    },

    #[error("API key expired or missing: {0}")]
    KeyExpiredOrMissing(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl ProviderError {
    pub fn rate_limited(message: impl Into<String>, headers: HashMap<String, String>) -> Self {
        ProviderError::RateLimited {
            message: message.into(),
            headers,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Lower-cased response headers captured with a rate-limit error
    pub fn headers(&self) -> Option<&HashMap<String, String>> {
        match self {
            ProviderError::RateLimited { headers, .. } => Some(headers),
            _ => None,
        }
    }
}

/// Per-call options handed to an adapter
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    /// `None` means the parameter must not be sent at all.
    pub temperature: Option<f32>,
    /// Ask the backend for a JSON object response where supported.
    pub json_mode: bool,
    /// Stream chunks to the sink as they arrive.
    pub stream: bool,
    /// Checked between streamed chunks.
    pub cancellation: Option<CancellationToken>,
}

impl SendOptions {
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Result of one successful backend call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    pub content: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl Completion {
    pub fn new(content: impl Into<String>, prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            content: content.into(),
            prompt_tokens,
            completion_tokens,
        }
    }
}

/// Adapter translating the generic contract into one backend's API.
///
/// Implementations live in the infrastructure layer.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> &Model;

    /// Send the conversation. Chunks (or the whole response, when not
    /// streaming) go to `sink`, followed by `None`.
    async fn send(
        &self,
        conversation: &Conversation,
        options: &SendOptions,
        sink: &dyn StreamSink,
    ) -> Result<Completion, ProviderError>;

    /// How long to back off after `error`, if the backend says so.
    ///
    /// `None` means the request should not be retried (for example an
    /// exhausted quota).
    fn rate_limit_delay(&self, error: &ProviderError) -> Option<Duration>;
}
